//! # Feature: Configuration
//!
//! Environment-driven configuration. `.env` is loaded by the binary before
//! [`Config::from_env`] runs.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Chat model selection, remote-session credentials, reply-all and privacy defaults
//! - 1.0.0: Initial environment variable configuration

use crate::features::backend::{BackendSettings, ChatModel};
use crate::features::image_gen::{ImageGenerator, DEFAULT_OPENAI_BASE_URL};
use anyhow::Result;
use log::{info, warn};
use std::env;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_REMOTE_BASE_URL: &str = "https://chat.openai.com/backend-api";

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub discord_guild_id: Option<String>,
    pub chat_model: ChatModel,
    pub gpt_engine: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub access_token: Option<String>,
    pub remote_base_url: String,
    pub starting_prompt_path: String,
    /// Channel the startup priming reply is posted to
    pub broadcast_channel_id: Option<u64>,
    pub reply_all: bool,
    pub reply_all_channel_id: Option<u64>,
    pub private_default: bool,
    pub database_path: String,
    pub log_level: String,
    pub backend_timeout: Duration,
    pub max_history_messages: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let chat_model = match get("CHAT_MODEL") {
            Some(raw) => raw.parse::<ChatModel>()?,
            None => ChatModel::ApiKey,
        };

        let config = Config {
            discord_token: get("DISCORD_BOT_TOKEN")
                .ok_or_else(|| anyhow::anyhow!("DISCORD_BOT_TOKEN environment variable not set"))?,
            discord_guild_id: get("DISCORD_GUILD_ID"),
            chat_model,
            gpt_engine: get("GPT_ENGINE").unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            access_token: get("ACCESS_TOKEN"),
            remote_base_url: get("REMOTE_SESSION_BASE_URL")
                .unwrap_or_else(|| DEFAULT_REMOTE_BASE_URL.to_string()),
            starting_prompt_path: get("STARTING_PROMPT_PATH")
                .unwrap_or_else(|| "starting-prompt.txt".to_string()),
            broadcast_channel_id: parse_id(&get, "DISCORD_CHANNEL_ID")?,
            reply_all: parse_flag(get("REPLYING_ALL")),
            reply_all_channel_id: parse_id(&get, "REPLYING_ALL_DISCORD_CHANNEL_ID")?,
            private_default: parse_flag(get("PRIVATE_DEFAULT")),
            database_path: get("DATABASE_PATH").unwrap_or_else(|| "relay.db".to_string()),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            backend_timeout: Duration::from_secs(
                get("BACKEND_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(120),
            ),
            max_history_messages: get("MAX_HISTORY_MESSAGES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(40),
        };

        if config.reply_all && config.reply_all_channel_id.is_none() {
            warn!("REPLYING_ALL is set without REPLYING_ALL_DISCORD_CHANNEL_ID; reply-all stays inactive until /replyall binds a channel");
        }

        Ok(config)
    }

    /// Credentials and tuning handed to the backend factory
    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            engine: self.gpt_engine.clone(),
            api_key: self.openai_api_key.clone(),
            access_token: self.access_token.clone(),
            remote_base_url: self.remote_base_url.clone(),
            request_timeout: self.backend_timeout,
            max_history_messages: self.max_history_messages,
        }
    }

    /// Image client for `/draw`, when an API key is configured
    pub fn image_generator(&self) -> Result<Option<ImageGenerator>> {
        let Some(key) = &self.openai_api_key else {
            return Ok(None);
        };
        let generator = ImageGenerator::new(&self.openai_base_url, key, self.backend_timeout)?;
        Ok(Some(generator))
    }

    /// Read the startup prompt once. A missing file is an empty prompt.
    pub fn load_startup_prompt(&self) -> Result<String> {
        let path = Path::new(&self.starting_prompt_path);
        if !path.exists() {
            info!(
                "No startup prompt at {}, starting without one",
                self.starting_prompt_path
            );
            return Ok(String::new());
        }
        let prompt = std::fs::read_to_string(path)?;
        info!(
            "Loaded startup prompt from {} ({} chars)",
            self.starting_prompt_path,
            prompt.chars().count()
        );
        Ok(prompt)
    }
}

fn parse_flag(value: Option<String>) -> bool {
    value.map_or(false, |v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
}

fn parse_id(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    get(key)
        .map(|raw| {
            raw.parse::<u64>()
                .map_err(|_| anyhow::anyhow!("{key} must be a numeric Discord id, got '{raw}'"))
        })
        .transpose()
}
