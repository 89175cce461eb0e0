//! Utility command handlers
//!
//! Handles: help
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: /help shows the relay commands and the live session state
//! - 1.0.0: Extracted from command_handler.rs

use anyhow::Result;
use async_trait::async_trait;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::prelude::Context;
use std::sync::Arc;
use std::time::Duration;

use crate::commands::context::CommandContext;
use crate::commands::handler::SlashCommandHandler;
use crate::core::embeds::help_embed;
use crate::features::get_bot_version;

/// Command list shown by `/help`
pub const COMMAND_HELP: &[(&str, &str)] = &[
    ("chat", "[message] Chat with the bot"),
    ("draw", "[prompt] Generate an image"),
    ("switchpersona", "[persona] Switch between personas"),
    ("private", "Replies are only visible to you"),
    ("public", "Replies are posted in the channel"),
    ("replyall", "Toggle between answering every message in this channel and `/chat` only"),
    ("chat-model", "Switch between the API key and website session backends"),
    ("reset", "Clear the conversation history and drop the persona"),
    ("register", "[name] Store your name, school, friends and preferences"),
    ("unregister", "Forget your stored profile"),
    ("help", "Show this message"),
];

pub struct UtilityHandler;

#[async_trait]
impl SlashCommandHandler for UtilityHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["help"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let status = status_fields(&ctx).await;
        let embed = help_embed(COMMAND_HELP, &status);

        command
            .create_interaction_response(&serenity_ctx.http, |response| {
                response
                    .kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|message| message.add_embed(embed))
            })
            .await?;
        Ok(())
    }
}

async fn status_fields(ctx: &CommandContext) -> Vec<(&'static str, String)> {
    let session = &ctx.session;
    let reply_all = match (session.is_reply_all(), session.reply_all_channel()) {
        (true, Some(channel)) => format!("on in <#{channel}>"),
        (true, None) => "on (no channel bound)".to_string(),
        (false, _) => "off".to_string(),
    };

    vec![
        ("Model", session.model().await.label().to_string()),
        ("Persona", session.current_persona()),
        (
            "Replies",
            if session.is_private() { "private" } else { "public" }.to_string(),
        ),
        ("Reply-all", reply_all),
        (
            "Working on",
            session
                .active_destination()
                .unwrap_or_else(|| "nothing".to_string()),
        ),
        ("Queued", ctx.queue.pending().to_string()),
        ("Uptime", format_uptime(ctx.start_time.elapsed())),
        ("Version", get_bot_version().to_string()),
    ]
}

fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (days, hours, minutes) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60);
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m {}s", secs % 60)
    }
}
