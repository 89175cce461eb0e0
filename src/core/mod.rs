//! # Core Module
//!
//! Core domain types, configuration, session state and reply chunking for
//! the relay bot.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.7.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Session state, backend error taxonomy, user profiles and fence-aware chunking
//! - 1.1.0: Add response module with Discord message chunking utilities
//! - 1.0.0: Initial creation with config module

pub mod config;
pub mod embeds;
pub mod error;
pub mod profile;
pub mod response;
pub mod session;

// Re-export commonly used items
pub use config::Config;
pub use error::{BackendError, BackendErrorKind, PersonaError};
pub use profile::UserProfile;
pub use response::{split_reply, split_reply_with_limit, Chunk, ChunkPlan, CHUNK_LIMIT, MESSAGE_LIMIT};
pub use session::{ModeChange, ModelSwitch, ReplyAllChange, Session};
