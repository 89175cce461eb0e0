//! Command handler registry
//!
//! - **Version**: 1.1.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 1.1.0: Build from the full handler set and dispatch interactions directly
//! - 1.0.0: Initial implementation for handler dispatch

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use log::{debug, warn};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::Context;

use super::context::CommandContext;
use super::handler::SlashCommandHandler;
use super::handlers::create_all_handlers;

/// Registry mapping command names to handlers
///
/// The registry allows handlers to be registered and looked up by command name.
/// Multiple command names can map to the same handler if they share logic.
///
/// # Example
///
/// ```ignore
/// let mut registry = CommandRegistry::new();
/// registry.register(Arc::new(ChatHandler));
/// registry.register(Arc::new(UtilityHandler));
///
/// if let Some(handler) = registry.get("chat") {
///     handler.handle(ctx, serenity_ctx, command).await?;
/// }
/// ```
#[derive(Clone)]
pub struct CommandRegistry {
    handlers: HashMap<&'static str, Arc<dyn SlashCommandHandler>>,
}

impl CommandRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry holding every handler the bot ships with
    pub fn with_all_handlers() -> Self {
        let mut registry = Self::new();
        for handler in create_all_handlers() {
            registry.register(handler);
        }
        registry
    }

    /// Register a handler for its declared command names
    ///
    /// The handler is registered for all names returned by `command_names()`.
    pub fn register(&mut self, handler: Arc<dyn SlashCommandHandler>) {
        for name in handler.command_names() {
            self.handlers.insert(name, Arc::clone(&handler));
        }
    }

    /// Get handler for a command name
    ///
    /// Returns None if no handler is registered for the given name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn SlashCommandHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Check if a command is registered
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered command names
    ///
    /// Note: This counts command names, not unique handlers.
    /// A handler registered for multiple names will be counted multiple times.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Route an interaction to its handler.
    ///
    /// Returns `Ok(false)` when no handler claims the command name.
    pub async fn dispatch(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<bool> {
        let name = command.data.name.as_str();
        let Some(handler) = self.get(name) else {
            warn!("No handler registered for /{name}");
            return Ok(false);
        };
        debug!("Dispatching /{name} for user {}", command.user.id);
        handler.handle(ctx, serenity_ctx, command).await?;
        Ok(true)
    }

    /// Get all registered command names
    pub fn command_names(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    // Mock handler for testing
    struct MockHandler {
        names: &'static [&'static str],
    }

    #[async_trait]
    impl SlashCommandHandler for MockHandler {
        fn command_names(&self) -> &'static [&'static str] {
            self.names
        }

        async fn handle(
            &self,
            _ctx: Arc<CommandContext>,
            _serenity_ctx: &Context,
            _command: &ApplicationCommandInteraction,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_registry_new_is_empty() {
        let registry = CommandRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_registry_register_single() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(MockHandler { names: &["reset"] }));

        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("reset"));
        assert!(!registry.contains("forget"));
    }

    #[test]
    fn test_registry_register_multiple_names() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(MockHandler {
            names: &["private", "public", "replyall"],
        }));

        assert_eq!(registry.len(), 3);
        assert!(registry.contains("private"));
        assert!(registry.contains("public"));
        assert!(registry.contains("replyall"));
    }

    #[test]
    fn test_registry_get_returns_handler() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(MockHandler { names: &["test"] }));

        let handler = registry.get("test");
        assert!(handler.is_some());

        let missing = registry.get("missing");
        assert!(missing.is_none());
    }

    #[test]
    fn test_all_handlers_cover_slash_commands() {
        let registry = CommandRegistry::with_all_handlers();
        for command in crate::commands::slash::create_slash_commands() {
            let name = command.0.get("name").unwrap().as_str().unwrap().to_string();
            assert!(registry.contains(&name), "No handler for /{name}");
        }
        assert_eq!(
            registry.len(),
            crate::commands::slash::create_slash_commands().len()
        );
    }

    #[test]
    fn test_registry_default() {
        let registry = CommandRegistry::default();
        assert!(registry.is_empty());
    }
}
