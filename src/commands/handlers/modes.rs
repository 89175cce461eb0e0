//! Reply mode handlers
//!
//! Handles: private, public, replyall
//!
//! - **Version**: 1.0.0
//! - **Since**: 5.0.0

use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::{respond, CommandContext};
use crate::commands::handler::SlashCommandHandler;
use crate::core::session::{ModeChange, ReplyAllChange};

pub struct ModesHandler;

#[async_trait]
impl SlashCommandHandler for ModesHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["private", "public", "replyall"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let reply = match command.data.name.as_str() {
            "private" => privacy_message(true, ctx.session.set_private(true)),
            "public" => privacy_message(false, ctx.session.set_private(false)),
            "replyall" => {
                let change = ctx.session.toggle_reply_all(command.channel_id.0);
                reply_all_message(change)
            }
            _ => return Ok(()),
        };
        info!(
            "/{} by user {} -> {}",
            command.data.name, command.user.id, reply
        );
        respond(&serenity_ctx.http, command, &reply, false).await
    }
}

fn privacy_message(private: bool, change: ModeChange) -> String {
    match (private, change) {
        (true, ModeChange::Switched) => {
            "> **Info: Replies will now be private. Use `/public` to switch back.**".to_string()
        }
        (true, ModeChange::AlreadySet) => {
            "> **Warn: Already in private mode. Use `/public` to switch to public mode.**"
                .to_string()
        }
        (false, ModeChange::Switched) => {
            "> **Info: Replies will now be posted in the channel. Use `/private` to switch back.**"
                .to_string()
        }
        (false, ModeChange::AlreadySet) => {
            "> **Warn: Already in public mode. Use `/private` to switch to private mode.**"
                .to_string()
        }
    }
}

fn reply_all_message(change: ReplyAllChange) -> String {
    match change {
        ReplyAllChange::Enabled(channel) => {
            warn!("Reply-all enabled for channel {channel}");
            format!(
                "> **Info: I will now answer every message in <#{channel}>. Use `/replyall` again to switch back to slash commands.**"
            )
        }
        ReplyAllChange::Disabled => {
            "> **Info: I will only answer `/chat` from now on. Use `/replyall` again to answer every message.**"
                .to_string()
        }
    }
}
