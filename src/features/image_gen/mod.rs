//! # Image Generation Feature
//!
//! Images API powered `/draw` command.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.1.0: Typed backend errors so rejected prompts get the inappropriate-request reply
//! - 1.0.0: Initial release

pub mod generator;

pub use generator::{GeneratedImage, ImageGenerator, ImageSize, DEFAULT_OPENAI_BASE_URL};
