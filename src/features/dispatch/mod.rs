//! # Feature: Message Dispatch
//!
//! Ordered queue of chat requests and the single worker that answers them.
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Queue-driven wake-up with acknowledgement guards; per-item panic isolation
//! - 1.0.0: Initial polling worker

pub mod discord;
pub mod queue;
pub mod worker;

pub use discord::{DiscordDestination, DiscordSender};
pub use queue::{
    dispatch_queue, Ack, DispatchQueue, DispatchReceiver, QueueClosed, QueueItem, RequestContext,
    Requester,
};
pub use worker::{ComposingGuard, DispatchWorker, ItemOutcome, PlatformSender};
