//! Discord side of the dispatch pipeline: reply destinations and the sender
//! that posts chunks to them.

use super::worker::{ComposingGuard, PlatformSender};
use crate::core::response::Chunk;
use anyhow::Result;
use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::id::ChannelId;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum DiscordDestination {
    /// Plain channel message (reply-all traffic, startup priming)
    Channel(ChannelId),
    /// Follow-up to a deferred slash command
    Followup {
        interaction: Arc<ApplicationCommandInteraction>,
        ephemeral: bool,
    },
}

impl DiscordDestination {
    pub fn channel_id(&self) -> ChannelId {
        match self {
            DiscordDestination::Channel(id) => *id,
            DiscordDestination::Followup { interaction, .. } => interaction.channel_id,
        }
    }
}

impl fmt::Display for DiscordDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscordDestination::Channel(id) => write!(f, "channel {id}"),
            DiscordDestination::Followup {
                interaction,
                ephemeral,
            } => write!(
                f,
                "/{} follow-up in channel {}{}",
                interaction.data.name,
                interaction.channel_id,
                if *ephemeral { " (private)" } else { "" }
            ),
        }
    }
}

pub struct DiscordSender {
    http: Arc<Http>,
}

impl DiscordSender {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PlatformSender for DiscordSender {
    type Destination = DiscordDestination;

    async fn composing(&self, destination: &DiscordDestination) -> Result<ComposingGuard> {
        let typing = destination.channel_id().start_typing(&self.http)?;
        Ok(ComposingGuard::new(move || {
            typing.stop();
        }))
    }

    async fn deliver(&self, destination: &DiscordDestination, chunk: &Chunk) -> Result<()> {
        match destination {
            DiscordDestination::Channel(channel_id) => {
                channel_id.say(&self.http, &chunk.text).await?;
            }
            DiscordDestination::Followup {
                interaction,
                ephemeral,
            } => {
                interaction
                    .create_followup_message(&self.http, |message| {
                        message.content(&chunk.text).ephemeral(*ephemeral)
                    })
                    .await?;
            }
        }
        Ok(())
    }
}
