//! # Session
//!
//! Process-wide state shared by command handlers and the dispatch worker:
//! the active chat backend, the active persona, and the privacy and
//! reply-all modes.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Runtime model switching through the backend factory
//! - 1.0.0: Initial shared session with mode flags

use crate::core::config::Config;
use crate::core::error::{BackendError, PersonaError};
use crate::features::backend::{ActiveBackend, BackendFactory, ChatBackend, ChatModel};
use crate::features::personas::{PersonaManager, PersonaSwitch, STANDARD_PERSONA};
use anyhow::Result;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(120);

/// Result of a privacy toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    Switched,
    AlreadySet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSwitch {
    AlreadyActive,
    Switched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyAllChange {
    /// Reply-all is now on and bound to this channel
    Enabled(u64),
    Disabled,
}

pub struct Session {
    backend: ActiveBackend,
    personas: PersonaManager,
    factory: BackendFactory,
    startup_prompt: String,
    broadcast_channel: Option<u64>,
    timeout: Duration,
    private: AtomicBool,
    reply_all: AtomicBool,
    reply_all_channel: RwLock<Option<u64>>,
    active_destination: RwLock<Option<String>>,
}

impl Session {
    pub fn new(backend: Box<dyn ChatBackend>, factory: BackendFactory) -> Self {
        Self {
            backend: Mutex::new(backend),
            personas: PersonaManager::default(),
            factory,
            startup_prompt: String::new(),
            broadcast_channel: None,
            timeout: DEFAULT_BACKEND_TIMEOUT,
            private: AtomicBool::new(false),
            reply_all: AtomicBool::new(false),
            reply_all_channel: RwLock::new(None),
            active_destination: RwLock::new(None),
        }
    }

    pub fn with_personas(mut self, personas: PersonaManager) -> Self {
        self.personas = personas;
        self
    }

    pub fn with_startup_prompt(mut self, prompt: impl Into<String>, broadcast_channel: Option<u64>) -> Self {
        self.startup_prompt = prompt.into();
        self.broadcast_channel = broadcast_channel;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_privacy(self, private: bool) -> Self {
        self.private.store(private, Ordering::SeqCst);
        self
    }

    pub fn with_reply_all(self, enabled: bool, channel: Option<u64>) -> Self {
        self.reply_all.store(enabled, Ordering::SeqCst);
        *self
            .reply_all_channel
            .write()
            .unwrap_or_else(PoisonError::into_inner) = channel;
        self
    }

    /// Build the session, including the initial backend, from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let startup_prompt = config.load_startup_prompt()?;
        let factory = config.backend_settings().factory();
        let backend = factory(config.chat_model).map_err(|e| {
            anyhow::anyhow!("Failed to create {} backend: {e}", config.chat_model)
        })?;
        info!("Chat backend ready: {}", config.chat_model);

        Ok(Self::new(backend, factory)
            .with_startup_prompt(startup_prompt, config.broadcast_channel_id)
            .with_timeout(config.backend_timeout)
            .with_privacy(config.private_default)
            .with_reply_all(config.reply_all, config.reply_all_channel_id))
    }

    /// Ask the active backend for a reply, bounded by the backend timeout.
    ///
    /// The backend lock is held until the call finishes, which is what keeps
    /// persona and model switches from landing mid-request.
    pub async fn generate_reply(&self, text: &str) -> Result<String, BackendError> {
        let mut active = self.backend.lock().await;
        match tokio::time::timeout(self.timeout, active.generate_reply(text)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::transport(format!(
                "backend did not answer within {}s",
                self.timeout.as_secs()
            ))),
        }
    }

    pub async fn model(&self) -> ChatModel {
        self.backend.lock().await.model()
    }

    /// Forget the conversation and drop any persona
    pub async fn reset(&self) -> Result<(), BackendError> {
        let mut active = self.backend.lock().await;
        active.reset().await?;
        self.personas.set_current(STANDARD_PERSONA);
        info!("Session reset, persona back to {STANDARD_PERSONA}");
        Ok(())
    }

    pub async fn switch_persona(&self, requested: &str) -> Result<PersonaSwitch, PersonaError> {
        self.personas.switch(&self.backend, requested).await
    }

    pub fn current_persona(&self) -> String {
        self.personas.current()
    }

    pub fn personas(&self) -> &PersonaManager {
        &self.personas
    }

    /// Replace the active backend with a fresh instance of `model`.
    ///
    /// On failure the current backend stays in place.
    pub async fn switch_model(&self, model: ChatModel) -> Result<ModelSwitch, BackendError> {
        let mut active = self.backend.lock().await;
        if active.model() == model {
            return Ok(ModelSwitch::AlreadyActive);
        }
        let replacement = (self.factory)(model)?;
        let previous = active.model();
        *active = replacement;
        self.personas.set_current(STANDARD_PERSONA);
        warn!("Switched chat model {previous} -> {model}");
        Ok(ModelSwitch::Switched)
    }

    pub fn is_private(&self) -> bool {
        self.private.load(Ordering::SeqCst)
    }

    pub fn set_private(&self, private: bool) -> ModeChange {
        if self.private.swap(private, Ordering::SeqCst) == private {
            ModeChange::AlreadySet
        } else {
            ModeChange::Switched
        }
    }

    pub fn is_reply_all(&self) -> bool {
        self.reply_all.load(Ordering::SeqCst)
    }

    pub fn reply_all_channel(&self) -> Option<u64> {
        *self
            .reply_all_channel
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Flip reply-all and bind it to `channel`
    pub fn toggle_reply_all(&self, channel: u64) -> ReplyAllChange {
        *self
            .reply_all_channel
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(channel);
        let was_enabled = self.reply_all.fetch_xor(true, Ordering::SeqCst);
        if was_enabled {
            ReplyAllChange::Disabled
        } else {
            ReplyAllChange::Enabled(channel)
        }
    }

    /// Whether a plain channel message should be relayed
    pub fn accepts_passive(&self, channel: u64) -> bool {
        self.is_reply_all() && self.reply_all_channel() == Some(channel)
    }

    pub fn startup_prompt(&self) -> &str {
        &self.startup_prompt
    }

    pub fn broadcast_channel(&self) -> Option<u64> {
        self.broadcast_channel
    }

    /// Record the destination currently being served, for status display
    pub fn mark_active(&self, destination: Option<String>) {
        *self
            .active_destination
            .write()
            .unwrap_or_else(PoisonError::into_inner) = destination;
    }

    pub fn active_destination(&self) -> Option<String> {
        self.active_destination
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
