//! # Feature: Startup Priming
//!
//! Sends the configured startup prompt through the normal dispatch path and
//! posts the reply to the broadcast channel. Runs once on the first Ready
//! event and again after `/reset`.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.4.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 2.0.0: Replaced the online notification embed with startup prompt priming
//! - 1.0.0: Initial release with DM and channel support

use crate::core::session::Session;
use crate::features::dispatch::{DispatchQueue, QueueClosed, RequestContext};
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};

/// Tracks whether this is the first Ready event (vs reconnect)
static FIRST_READY: AtomicBool = AtomicBool::new(true);

/// True exactly once per process
pub fn take_first_ready() -> bool {
    FIRST_READY.swap(false, Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priming {
    /// Queued at this admission order
    Enqueued(u64),
    NoPrompt,
    NoDestination,
}

/// Queue the startup prompt for the broadcast channel.
///
/// Anything enqueued afterwards is answered after the priming reply.
pub fn enqueue_priming<D>(
    queue: &DispatchQueue<D>,
    session: &Session,
    to_destination: impl FnOnce(u64) -> D,
) -> Result<Priming, QueueClosed> {
    let prompt = session.startup_prompt();
    if prompt.trim().is_empty() {
        info!("No startup prompt given, skipping priming");
        return Ok(Priming::NoPrompt);
    }
    let Some(channel) = session.broadcast_channel() else {
        info!("No broadcast channel configured, skipping priming");
        return Ok(Priming::NoDestination);
    };

    let order = queue.enqueue(RequestContext::system(to_destination(channel)), prompt)?;
    info!(
        "Queued startup prompt ({} chars) for channel {channel}",
        prompt.chars().count()
    );
    Ok(Priming::Enqueued(order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::BackendError;
    use crate::features::backend::{BackendFactory, ChatBackend, ChatModel};
    use crate::features::dispatch::dispatch_queue;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Quiet;

    #[async_trait]
    impl ChatBackend for Quiet {
        fn model(&self) -> ChatModel {
            ChatModel::ApiKey
        }
        async fn generate_reply(&mut self, _text: &str) -> Result<String, BackendError> {
            Ok(String::new())
        }
        async fn reset(&mut self) -> Result<(), BackendError> {
            Ok(())
        }
        async fn with_system_prompt(&self, _prompt: &str) -> Result<Box<dyn ChatBackend>, BackendError> {
            Ok(Box::new(Quiet))
        }
    }

    fn session() -> Session {
        let factory: BackendFactory = Arc::new(
            |_model: ChatModel| -> Result<Box<dyn ChatBackend>, BackendError> { Ok(Box::new(Quiet)) },
        );
        Session::new(Box::new(Quiet), factory)
    }

    #[tokio::test]
    async fn test_priming_enqueues_system_item() {
        let (queue, mut receiver) = dispatch_queue::<String>();
        let session = session().with_startup_prompt("Be brief.", Some(99));

        let priming = enqueue_priming(&queue, &session, |id| format!("channel {id}")).unwrap();
        assert_eq!(priming, Priming::Enqueued(0));

        let (item, _ack) = receiver.recv().await.unwrap();
        assert_eq!(item.user_text, "Be brief.");
        assert_eq!(item.context.destination, "channel 99");
        assert!(item.context.requester.is_none());
    }

    #[tokio::test]
    async fn test_priming_skips_without_prompt_or_channel() {
        let (queue, _receiver) = dispatch_queue::<String>();

        let no_prompt = session().with_startup_prompt("  \n", Some(1));
        assert_eq!(
            enqueue_priming(&queue, &no_prompt, |id| id.to_string()).unwrap(),
            Priming::NoPrompt
        );

        let no_channel = session().with_startup_prompt("Be brief.", None);
        assert_eq!(
            enqueue_priming(&queue, &no_channel, |id| id.to_string()).unwrap(),
            Priming::NoDestination
        );
        assert_eq!(queue.pending(), 0);
    }
}
