//! # Startup Feature
//!
//! Startup prompt priming on first connect.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.4.0
//! - **Toggleable**: true

pub mod priming;

pub use priming::{enqueue_priming, take_first_ready, Priming};
