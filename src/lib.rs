// Core layer - shared types, configuration, session and reply chunking
pub mod core;

// Features layer - backends, personas, dispatch, image generation, startup
pub mod features;

// Infrastructure
pub mod database;

// Application layer
pub mod commands;

pub use core::{Config, Session};

pub use features::{
    // Backends
    ChatBackend, ChatModel,
    // Dispatch
    dispatch_queue, DispatchQueue, DispatchWorker, PlatformSender,
    // Personas
    PersonaManager,
};
