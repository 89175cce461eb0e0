//! Persona command handlers
//!
//! Handles: switchpersona
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: Switch the session persona through the active backend
//! - 1.0.0: Extracted from command_handler.rs

use anyhow::Result;
use async_trait::async_trait;
use log::{error, info};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::{defer, respond, CommandContext, REPLY_ALL_REFUSAL};
use crate::commands::handler::SlashCommandHandler;
use crate::commands::slash::get_string_option;
use crate::core::error::PersonaError;
use crate::features::personas::PersonaSwitch;

pub struct PersonaHandler;

#[async_trait]
impl SlashCommandHandler for PersonaHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["switchpersona"]
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

        let requested = get_string_option(&command.data.options, "persona")
            .ok_or_else(|| anyhow::anyhow!("Missing persona parameter"))?;

        // Waits for any in-flight reply and may prime a remote conversation
        defer(&serenity_ctx.http, command, false).await?;

        let result = ctx.session.switch_persona(&requested).await;
        if let Err(PersonaError::Backend(e)) = &result {
            error!("Persona switch to '{requested}' failed: {e}");
        }
        let reply = switch_message(&requested, &result);
        info!("/switchpersona '{requested}' by user {}", command.user.id);

        command
            .create_followup_message(&serenity_ctx.http, |m| m.content(reply))
            .await?;
        Ok(())
    }
}

fn switch_message(requested: &str, result: &Result<PersonaSwitch, PersonaError>) -> String {
    match result {
        Ok(PersonaSwitch::AlreadyActive(p)) => format!("> **Warn: Already set to `{p}` persona**"),
        Ok(PersonaSwitch::Switched(p)) => format!("> **Info: Switched to `{p}` persona**"),
        Err(PersonaError::Unknown(_)) => {
            format!("> **Error: No available persona: `{requested}` 😿**")
        }
        Err(PersonaError::Backend(e)) => e.user_message().to_string(),
    }
}
