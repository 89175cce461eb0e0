//! Slash command handler trait and infrastructure
//!
//! - **Version**: 1.1.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 1.1.0: Handlers reach the chat backend only through the session and dispatch queue
//! - 1.0.0: Initial implementation for modular command handling

use anyhow::Result;
use async_trait::async_trait;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::Context;
use std::sync::Arc;

use super::context::CommandContext;

/// A slash command the relay answers.
///
/// Handlers never call a chat backend themselves. Anything that needs a model
/// reply acknowledges the interaction with [`defer`](super::context::defer)
/// and hands the text to the dispatch queue; the worker posts the follow-up.
/// Handlers that only touch session state (privacy, personas, model) answer
/// directly.
///
/// ```ignore
/// pub struct AskHandler;
///
/// #[async_trait]
/// impl SlashCommandHandler for AskHandler {
///     fn command_names(&self) -> &'static [&'static str] {
///         &["ask"]
///     }
///
///     async fn handle(
///         &self,
///         ctx: Arc<CommandContext>,
///         serenity_ctx: &Context,
///         command: &ApplicationCommandInteraction,
///     ) -> Result<()> {
///         let question = get_string_option(&command.data.options, "question")
///             .ok_or_else(|| anyhow::anyhow!("Missing question parameter"))?;
///         let ephemeral = ctx.session.is_private();
///         defer(&serenity_ctx.http, command, ephemeral).await?;
///
///         let destination = DiscordDestination::Followup {
///             interaction: Arc::new(command.clone()),
///             ephemeral,
///         };
///         let requester = ctx.requester(command.user.id.0).await;
///         ctx.queue.enqueue(RequestContext::new(destination, requester), question)?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait SlashCommandHandler: Send + Sync {
    /// Names routed to this handler by the registry
    fn command_names(&self) -> &'static [&'static str];

    /// Answer `command`. An `Err` is reported to the user as a transport
    /// failure by the event handler.
    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()>;
}
