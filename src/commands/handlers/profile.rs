//! Profile command handlers
//!
//! Handles: register, unregister
//!
//! - **Version**: 1.0.0
//! - **Since**: 5.0.0

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::{respond, CommandContext};
use crate::commands::handler::SlashCommandHandler;
use crate::commands::slash::get_string_option;
use crate::core::profile::UserProfile;

pub struct ProfileHandler;

#[async_trait]
impl SlashCommandHandler for ProfileHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["register", "unregister"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let user_id = command.user.id.to_string();
        let reply = match command.data.name.as_str() {
            "register" => {
                let profile = profile_from_options(&user_id, command)?;
                ctx.database.upsert_profile(&profile).await?;
                info!(
                    "User {user_id} registered with {} preference(s)",
                    profile.preferences.len()
                );
                format!("> **Info: Saved your profile, {}.**", profile.name)
            }
            "unregister" => {
                if ctx.database.delete_profile(&user_id).await? {
                    info!("User {user_id} removed their profile");
                    "> **Info: Your profile has been removed.**".to_string()
                } else {
                    "> **Warn: You have no stored profile.**".to_string()
                }
            }
            _ => return Ok(()),
        };
        respond(&serenity_ctx.http, command, &reply, true).await
    }
}

fn profile_from_options(
    user_id: &str,
    command: &ApplicationCommandInteraction,
) -> Result<UserProfile> {
    let options = &command.data.options;
    let name = get_string_option(options, "name")
        .ok_or_else(|| anyhow::anyhow!("Missing name parameter"))?;

    let mut profile = UserProfile::new(user_id, name.trim());
    profile.school = get_string_option(options, "school")
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    profile.friends = get_string_option(options, "friends")
        .map(|s| split_list(&s))
        .unwrap_or_default();
    profile.preferences = get_string_option(options, "preferences")
        .map(|s| UserProfile::parse_preferences(&s))
        .unwrap_or_default();
    Ok(profile)
}

fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_handler_commands() {
        let names = ProfileHandler.command_names();
        assert!(names.contains(&"register"));
        assert!(names.contains(&"unregister"));
    }

    #[test]
    fn test_split_list_skips_blanks() {
        assert_eq!(split_list("Ann, ,Bo,"), vec!["Ann", "Bo"]);
        assert!(split_list("").is_empty());
    }
}
