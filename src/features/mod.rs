//! # Features
//!
//! Feature modules of the relay bot. Each module carries its own version
//! header and changelog.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0

pub mod backend;
pub mod dispatch;
pub mod image_gen;
pub mod personas;
pub mod startup;

pub use backend::{ActiveBackend, BackendFactory, BackendSettings, ChatBackend, ChatModel};
pub use dispatch::{
    dispatch_queue, DiscordDestination, DiscordSender, DispatchQueue, DispatchReceiver,
    DispatchWorker, PlatformSender, RequestContext, Requester,
};
pub use image_gen::{ImageGenerator, ImageSize};
pub use personas::{PersonaCatalog, PersonaManager, PersonaSwitch};
pub use startup::{enqueue_priming, take_first_ready, Priming};

/// Crate version shown by `/help`
pub fn get_bot_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
