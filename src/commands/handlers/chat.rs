//! Chat command handler
//!
//! Handles: chat
//!
//! - **Version**: 1.0.0
//! - **Since**: 5.0.0

use anyhow::Result;
use async_trait::async_trait;
use log::{error, info};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::{defer, respond, CommandContext, REPLY_ALL_REFUSAL};
use crate::commands::handler::SlashCommandHandler;
use crate::commands::slash::get_string_option;
use crate::core::error::TRANSPORT_MESSAGE;
use crate::features::dispatch::{DiscordDestination, RequestContext};

/// Handler for `/chat`: queues the message for the dispatch worker
pub struct ChatHandler;

#[async_trait]
impl SlashCommandHandler for ChatHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["chat"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        if ctx.session.is_reply_all() {
            return respond(&serenity_ctx.http, command, REPLY_ALL_REFUSAL, false).await;
        }

        let message = get_string_option(&command.data.options, "message")
            .ok_or_else(|| anyhow::anyhow!("Missing message parameter"))?;
        let user_id = command.user.id.0;
        let ephemeral = ctx.session.is_private();

        // The worker may take a while to reach this item
        defer(&serenity_ctx.http, command, ephemeral).await?;

        let requester = ctx.requester(user_id).await;
        let destination = DiscordDestination::Followup {
            interaction: Arc::new(command.clone()),
            ephemeral,
        };

        match ctx
            .queue
            .enqueue(RequestContext::new(destination, requester), message.as_str())
        {
            Ok(order) => {
                info!(
                    "Queued /chat from user {user_id} as item #{order} ({} chars)",
                    message.chars().count()
                );
            }
            Err(e) => {
                error!("Could not queue /chat from user {user_id}: {e}");
                command
                    .create_followup_message(&serenity_ctx.http, |m| {
                        m.content(TRANSPORT_MESSAGE).ephemeral(ephemeral)
                    })
                    .await?;
            }
        }
        Ok(())
    }
}
