//! Conversation control handlers
//!
//! Handles: chat-model, reset
//!
//! - **Version**: 1.0.0
//! - **Since**: 5.0.0

use anyhow::Result;
use async_trait::async_trait;
use log::{error, info, warn};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::id::ChannelId;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::{defer, CommandContext};
use crate::commands::handler::SlashCommandHandler;
use crate::commands::slash::get_string_option;
use crate::core::session::ModelSwitch;
use crate::features::backend::ChatModel;
use crate::features::dispatch::DiscordDestination;
use crate::features::startup::{enqueue_priming, Priming};

pub struct ConversationHandler;

#[async_trait]
impl SlashCommandHandler for ConversationHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["chat-model", "reset"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        match command.data.name.as_str() {
            "chat-model" => self.handle_chat_model(&ctx, serenity_ctx, command).await,
            "reset" => self.handle_reset(&ctx, serenity_ctx, command).await,
            _ => Ok(()),
        }
    }
}

impl ConversationHandler {
    /// Handle /chat-model - swap the active backend variant
    async fn handle_chat_model(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let choice = get_string_option(&command.data.options, "choice")
            .ok_or_else(|| anyhow::anyhow!("Missing choice parameter"))?;
        let model: ChatModel = choice.parse()?;

        // The switch waits for any in-flight reply
        defer(&serenity_ctx.http, command, false).await?;
        let reply = switch_model(ctx, model).await;
        followup(serenity_ctx, command, reply).await
    }

    /// Handle /reset - forget the conversation, drop the persona, re-prime
    async fn handle_reset(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        defer(&serenity_ctx.http, command, false).await?;
        let reply = reset(ctx).await;
        info!("/reset by user {}", command.user.id);
        followup(serenity_ctx, command, reply).await
    }
}

async fn followup(
    serenity_ctx: &Context,
    command: &ApplicationCommandInteraction,
    reply: String,
) -> Result<()> {
    command
        .create_followup_message(&serenity_ctx.http, |m| m.content(reply))
        .await?;
    Ok(())
}

/// Swap the backend and re-prime on success. Returns the user-facing reply.
async fn switch_model(ctx: &CommandContext, model: ChatModel) -> String {
    match ctx.session.switch_model(model).await {
        Ok(ModelSwitch::Switched) => {
            prime(ctx);
            format!(
                "> **Info: You are now on the {}.**\n> {}",
                model.label(),
                model.credential_hint()
            )
        }
        Ok(ModelSwitch::AlreadyActive) => {
            format!("> **Warn: Already on the {}.**", model.label())
        }
        Err(e) => {
            error!("Switch to {model} failed: {e}");
            format!("{}\n> {}", e.user_message(), model.credential_hint())
        }
    }
}

/// Reset the session and re-prime on success. Returns the user-facing reply.
async fn reset(ctx: &CommandContext) -> String {
    match ctx.session.reset().await {
        Ok(()) => {
            prime(ctx);
            "> **Info: I have forgotten everything.**".to_string()
        }
        Err(e) => {
            error!("Reset failed: {e}");
            e.user_message().to_string()
        }
    }
}

/// Queue the startup prompt for the broadcast channel
fn prime(ctx: &CommandContext) {
    match enqueue_priming(&ctx.queue, &ctx.session, |id| {
        DiscordDestination::Channel(ChannelId(id))
    }) {
        Ok(Priming::Enqueued(order)) => info!("Re-priming queued as item #{order}"),
        Ok(_) => {}
        Err(e) => warn!("Could not queue re-priming: {e}"),
    }
}
