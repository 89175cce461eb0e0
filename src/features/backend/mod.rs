//! # Feature: Chat Backends
//!
//! Two interchangeable conversational engines behind one contract:
//! the API-key client (local history, reset by reconstruction) and the
//! remote-session client (server-side history, reset by hiding the remote
//! conversation).
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Backend factory so `/chat-model` can build a fresh variant at runtime
//! - 1.1.0: Remote-session variant
//! - 1.0.0: API-key variant on the openai crate

pub mod api_key;
pub mod remote_session;

pub use api_key::ApiKeyBackend;
pub use remote_session::RemoteSessionBackend;

use crate::core::error::BackendError;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Which engine the session talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatModel {
    /// Official API with an API key (`OFFICIAL` in older configs)
    ApiKey,
    /// Website session with an access token (`UNOFFICIAL` in older configs)
    RemoteSession,
}

impl ChatModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatModel::ApiKey => "API_KEY",
            ChatModel::RemoteSession => "REMOTE_SESSION",
        }
    }

    /// Human readable name for Discord replies
    pub fn label(&self) -> &'static str {
        match self {
            ChatModel::ApiKey => "Official API model",
            ChatModel::RemoteSession => "Website ChatGPT session",
        }
    }

    /// What has to be configured for this model to work
    pub fn credential_hint(&self) -> &'static str {
        match self {
            ChatModel::ApiKey => "You need to set your `OPENAI_API_KEY` in the `.env` file.",
            ChatModel::RemoteSession => "You need to set your `ACCESS_TOKEN` in the `.env` file.",
        }
    }
}

impl fmt::Display for ChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatModel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "API_KEY" | "OFFICIAL" => Ok(ChatModel::ApiKey),
            "REMOTE_SESSION" | "UNOFFICIAL" => Ok(ChatModel::RemoteSession),
            other => Err(anyhow::anyhow!(
                "Unknown chat model '{other}' (expected API_KEY or REMOTE_SESSION)"
            )),
        }
    }
}

/// Uniform contract both engines expose to the dispatch worker and personas
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn model(&self) -> ChatModel;

    /// Send `text` as the next conversational turn and return the reply
    async fn generate_reply(&mut self, text: &str) -> Result<String, BackendError>;

    /// Return to a fresh conversation. Calling it twice equals calling it once.
    async fn reset(&mut self) -> Result<(), BackendError>;

    /// Build an instance configured with `prompt` as its system prompt.
    ///
    /// `self` is left untouched so a failed switch keeps the old backend usable.
    async fn with_system_prompt(&self, prompt: &str) -> Result<Box<dyn ChatBackend>, BackendError>;
}

/// The session's active backend. Held for the whole of a backend call, so a
/// persona or model switch can only land between calls.
pub type ActiveBackend = Mutex<Box<dyn ChatBackend>>;

/// Builds a fresh backend of the given model
pub type BackendFactory =
    Arc<dyn Fn(ChatModel) -> Result<Box<dyn ChatBackend>, BackendError> + Send + Sync>;

/// Credentials and tuning shared by both variants
#[derive(Clone)]
pub struct BackendSettings {
    pub engine: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub remote_base_url: String,
    pub request_timeout: Duration,
    pub max_history_messages: usize,
}

impl fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSettings")
            .field("engine", &self.engine)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("remote_base_url", &self.remote_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_history_messages", &self.max_history_messages)
            .finish()
    }
}

impl BackendSettings {
    /// Construct a backend of the requested model with no persona applied
    pub fn build(&self, model: ChatModel) -> Result<Box<dyn ChatBackend>, BackendError> {
        match model {
            ChatModel::ApiKey => {
                if self.api_key.as_deref().map_or(true, str::is_empty) {
                    return Err(BackendError::auth("OPENAI_API_KEY is not configured"));
                }
                Ok(Box::new(ApiKeyBackend::new(
                    self.engine.clone(),
                    "",
                    self.max_history_messages,
                )))
            }
            ChatModel::RemoteSession => {
                let token = self
                    .access_token
                    .clone()
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| BackendError::auth("ACCESS_TOKEN is not configured"))?;
                let backend = RemoteSessionBackend::new(
                    self.remote_base_url.clone(),
                    token,
                    &self.engine,
                    self.request_timeout,
                )?;
                Ok(Box::new(backend))
            }
        }
    }

    /// Factory closure handed to the session for runtime model switches
    pub fn factory(self) -> BackendFactory {
        Arc::new(move |model| self.build(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> BackendSettings {
        BackendSettings {
            engine: "gpt-3.5-turbo".to_string(),
            api_key: Some("sk-test".to_string()),
            access_token: None,
            remote_base_url: "http://localhost:1".to_string(),
            request_timeout: Duration::from_secs(5),
            max_history_messages: 10,
        }
    }

    #[test]
    fn test_chat_model_parsing_accepts_legacy_names() {
        assert_eq!("OFFICIAL".parse::<ChatModel>().unwrap(), ChatModel::ApiKey);
        assert_eq!("api_key".parse::<ChatModel>().unwrap(), ChatModel::ApiKey);
        assert_eq!(
            "UNOFFICIAL".parse::<ChatModel>().unwrap(),
            ChatModel::RemoteSession
        );
        assert_eq!(
            "remote_session".parse::<ChatModel>().unwrap(),
            ChatModel::RemoteSession
        );
        assert!("gpt".parse::<ChatModel>().is_err());
    }

    #[test]
    fn test_build_api_key_backend() {
        let backend = settings().build(ChatModel::ApiKey).unwrap();
        assert_eq!(backend.model(), ChatModel::ApiKey);
    }

    #[test]
    fn test_build_without_credentials_is_auth_error() {
        let err = settings()
            .build(ChatModel::RemoteSession)
            .err()
            .expect("missing token should fail");
        assert_eq!(err.kind(), crate::core::error::BackendErrorKind::Auth);

        let mut no_key = settings();
        no_key.api_key = Some(String::new());
        let err = no_key.build(ChatModel::ApiKey).err().unwrap();
        assert_eq!(err.kind(), crate::core::error::BackendErrorKind::Auth);
    }

    #[test]
    fn test_settings_debug_redacts_secrets() {
        let rendered = format!("{:?}", settings());
        assert!(!rendered.contains("sk-test"));
        assert!(rendered.contains("<redacted>"));
    }
}
