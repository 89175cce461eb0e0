//! Per-command handler implementations
//!
//! - **Version**: 3.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 3.0.0: Relay command set (chat, modes, conversation, switchpersona, draw, profile, help)
//! - 2.0.0: Remove AiChatHandler (hey, explain, simple, steps, recipe) - consolidated into /ask
//! - 1.1.0: Add ImagineHandler
//! - 1.0.0: Initial extraction from monolithic command_handler.rs

pub mod chat;
pub mod conversation;
pub mod draw;
pub mod modes;
pub mod persona;
pub mod profile;
pub mod utility;

use std::sync::Arc;

use super::handler::SlashCommandHandler;

/// Create all registered command handlers
///
/// Returns a vector of handlers ready to be registered with CommandRegistry.
pub fn create_all_handlers() -> Vec<Arc<dyn SlashCommandHandler>> {
    vec![
        Arc::new(chat::ChatHandler),
        Arc::new(modes::ModesHandler),
        Arc::new(conversation::ConversationHandler),
        Arc::new(persona::PersonaHandler),
        Arc::new(draw::DrawHandler),
        Arc::new(profile::ProfileHandler),
        Arc::new(utility::UtilityHandler),
    ]
}
