//! Typed failures raised by the chat backends and the persona layer
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Map HTTP status codes into error kinds for the HTTP-backed clients
//! - 1.0.0: Initial taxonomy (transport, policy rejection, auth, unknown persona)

use std::fmt;

/// Shown when the backend could not be reached or answered garbage
pub const TRANSPORT_MESSAGE: &str = "> **Error: Something went wrong, please try again later!**";
/// Shown when the engine refused the request on content grounds
pub const POLICY_MESSAGE: &str = "> **Warn: Inappropriate request 😿**";
/// Shown when the configured credentials were rejected
pub const AUTH_MESSAGE: &str = "> **Error: The bot's chat backend credentials were rejected. Check the API key / access token configuration.**";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    /// Network or IO failure, timeouts, unparseable responses
    Transport,
    /// The engine refused the input (content policy, invalid request)
    PolicyRejected,
    /// Missing or rejected credentials
    Auth,
}

impl BackendErrorKind {
    /// Short status line for the requester. Internal detail stays in the logs.
    pub fn user_message(self) -> &'static str {
        match self {
            BackendErrorKind::Transport => TRANSPORT_MESSAGE,
            BackendErrorKind::PolicyRejected => POLICY_MESSAGE,
            BackendErrorKind::Auth => AUTH_MESSAGE,
        }
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BackendErrorKind::Transport => "transport",
            BackendErrorKind::PolicyRejected => "policy rejection",
            BackendErrorKind::Auth => "authentication",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct BackendError {
    kind: BackendErrorKind,
    message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Transport, message)
    }

    pub fn policy_rejected(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::PolicyRejected, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Auth, message)
    }

    pub fn kind(&self) -> BackendErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }

    /// Classify a non-success HTTP response from one of the engines.
    ///
    /// 401/403 are credential problems, 400/422 are request rejections
    /// (including content-policy refusals), everything else is transport.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = format!("HTTP {status}: {}", body.chars().take(300).collect::<String>());
        match status {
            401 | 403 => Self::auth(detail),
            400 | 422 => Self::policy_rejected(detail),
            _ if mentions_content_policy(body) => Self::policy_rejected(detail),
            _ => Self::transport(detail),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::from_status(status.as_u16(), &err.to_string()),
            None => Self::transport(err.to_string()),
        }
    }
}

/// True when an engine error body talks about moderation or safety
pub fn mentions_content_policy(text: &str) -> bool {
    let lowered = text.to_lowercase();
    ["content_policy", "content policy", "safety", "moderation", "flagged"]
        .iter()
        .any(|needle| lowered.contains(needle))
}

#[derive(Debug, thiserror::Error)]
pub enum PersonaError {
    #[error("no available persona `{0}`")]
    Unknown(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
