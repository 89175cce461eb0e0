//! Shared context for command handlers
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: Session, dispatch queue and profile store replace the per-command OpenAI calls
//! - 1.1.0: Add ImageGenerator for imagine command
//! - 1.0.0: Initial implementation with core shared state

use crate::core::session::Session;
use crate::database::Database;
use crate::features::dispatch::{DiscordDestination, DispatchQueue, Requester};
use crate::features::image_gen::ImageGenerator;
use anyhow::Result;
use log::warn;
use serenity::http::Http;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use std::sync::Arc;
use std::time::Instant;

/// Sent instead of running a slash command while reply-all mode is on
pub const REPLY_ALL_REFUSAL: &str =
    "> **Warn: Reply-all mode is on. To use slash commands again, switch back to normal mode with `/replyall`**";

/// Shared context for all command handlers
///
/// Handlers never talk to a chat backend directly: chat traffic goes through
/// the dispatch queue, and mode changes go through the session.
#[derive(Clone)]
pub struct CommandContext {
    pub session: Arc<Session>,
    pub queue: DispatchQueue<DiscordDestination>,
    pub database: Database,
    /// `None` when no API key is configured
    pub image_generator: Option<ImageGenerator>,
    pub start_time: Instant,
}

impl CommandContext {
    pub fn new(
        session: Arc<Session>,
        queue: DispatchQueue<DiscordDestination>,
        database: Database,
        image_generator: Option<ImageGenerator>,
    ) -> Self {
        Self {
            session,
            queue,
            database,
            image_generator,
            start_time: Instant::now(),
        }
    }

    /// Requester with their stored profile attached.
    ///
    /// A failed lookup only costs the personalisation, so it is logged and
    /// the request goes ahead without a profile.
    pub async fn requester(&self, user_id: u64) -> Requester {
        let profile = match self.database.get_profile(&user_id.to_string()).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Profile lookup failed for user {user_id}: {e:#}");
                None
            }
        };
        Requester::new(user_id).with_profile(profile)
    }
}

/// Answer an interaction with a single plain message
pub async fn respond(
    http: &Http,
    command: &ApplicationCommandInteraction,
    content: &str,
    ephemeral: bool,
) -> Result<()> {
    command
        .create_interaction_response(http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.content(content).ephemeral(ephemeral))
        })
        .await?;
    Ok(())
}

/// Acknowledge now and answer later through follow-ups
pub async fn defer(
    http: &Http,
    command: &ApplicationCommandInteraction,
    ephemeral: bool,
) -> Result<()> {
    command
        .create_interaction_response(http, |response| {
            response
                .kind(InteractionResponseType::DeferredChannelMessageWithSource)
                .interaction_response_data(|message| message.ephemeral(ephemeral))
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to defer interaction: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_context_clone() {
        // CommandContext should be Clone for sharing across handlers
        fn assert_clone<T: Clone>() {}
        assert_clone::<CommandContext>();
    }

    #[test]
    fn test_reply_all_refusal_points_at_toggle() {
        assert!(REPLY_ALL_REFUSAL.starts_with("> **Warn:"));
        assert!(REPLY_ALL_REFUSAL.contains("/replyall"));
    }
}
