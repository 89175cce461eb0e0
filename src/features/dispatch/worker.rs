//! The single consumer of the dispatch queue.
//!
//! Per item: show a composing indicator, ask the session's backend, split
//! the reply and deliver the chunks in order. Every failure stays inside the
//! item; the loop only ends when all producers are gone.

use super::queue::{DispatchReceiver, QueueItem};
use crate::core::error::{BackendError, BackendErrorKind, TRANSPORT_MESSAGE};
use crate::core::response::{split_reply, Chunk};
use crate::core::session::Session;
use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use log::{error, info, warn};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Runs its stop action when dropped
pub struct ComposingGuard {
    stop: Option<Box<dyn FnOnce() + Send>>,
}

impl ComposingGuard {
    pub fn new(stop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            stop: Some(Box::new(stop)),
        }
    }

    pub fn noop() -> Self {
        Self { stop: None }
    }
}

impl Drop for ComposingGuard {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop();
        }
    }
}

/// The outbound side of the chat platform
#[async_trait]
pub trait PlatformSender: Send + Sync + 'static {
    type Destination: Clone + fmt::Display + Send + Sync + 'static;

    /// Start a "typing" style indicator that lasts until the guard drops
    async fn composing(&self, destination: &Self::Destination) -> Result<ComposingGuard>;

    async fn deliver(&self, destination: &Self::Destination, chunk: &Chunk) -> Result<()>;
}

#[derive(Debug, thiserror::Error)]
enum ItemFailure {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("delivery failed: {0:#}")]
    Delivery(anyhow::Error),
}

/// What happened to one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Reply delivered in this many chunks
    Delivered(usize),
    BackendFailed(BackendErrorKind),
    DeliveryFailed,
    Panicked,
}

pub struct DispatchWorker<S: PlatformSender> {
    session: Arc<Session>,
    sender: Arc<S>,
}

impl<S: PlatformSender> Clone for DispatchWorker<S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<S: PlatformSender> DispatchWorker<S> {
    pub fn new(session: Arc<Session>, sender: Arc<S>) -> Self {
        Self { session, sender }
    }

    /// Drain the queue until every producer handle is dropped
    pub async fn run(self, mut receiver: DispatchReceiver<S::Destination>) {
        info!("🚀 Dispatch worker started");
        while let Some((item, _ack)) = receiver.recv().await {
            self.process(&item).await;
        }
        info!("Dispatch worker stopped: no producers left");
    }

    /// Handle one item to completion. Never fails and never panics outward.
    pub async fn process(&self, item: &QueueItem<S::Destination>) -> ItemOutcome {
        let request_id = item.request_id;
        let destination = &item.context.destination;
        info!(
            "[{request_id}] 📥 Processing item #{} for {destination}",
            item.order
        );

        let outcome = match AssertUnwindSafe(self.handle(item)).catch_unwind().await {
            Ok(Ok(chunks)) => {
                info!("[{request_id}] 📤 Delivered reply in {chunks} chunk(s)");
                ItemOutcome::Delivered(chunks)
            }
            Ok(Err(ItemFailure::Backend(e))) => {
                error!("[{request_id}] ❌ Backend {} error: {}", e.kind(), e.message());
                self.notify(item, e.user_message()).await;
                ItemOutcome::BackendFailed(e.kind())
            }
            Ok(Err(failure @ ItemFailure::Delivery(_))) => {
                error!("[{request_id}] ❌ {failure}");
                self.notify(item, TRANSPORT_MESSAGE).await;
                ItemOutcome::DeliveryFailed
            }
            Err(panic) => {
                error!(
                    "[{request_id}] ❌ Item panicked: {}",
                    panic_reason(panic.as_ref())
                );
                self.notify(item, TRANSPORT_MESSAGE).await;
                ItemOutcome::Panicked
            }
        };

        self.session.mark_active(None);
        outcome
    }

    async fn handle(&self, item: &QueueItem<S::Destination>) -> Result<usize, ItemFailure> {
        let request_id = item.request_id;
        let destination = &item.context.destination;
        self.session.mark_active(Some(destination.to_string()));

        let _composing = match self.sender.composing(destination).await {
            Ok(guard) => guard,
            Err(e) => {
                warn!("[{request_id}] Could not show typing indicator: {e:#}");
                ComposingGuard::noop()
            }
        };

        let prompt = item.context.backend_prompt(&item.user_text);
        let reply = self.session.generate_reply(&prompt).await?;

        let text = format!("{}{}", item.context.header(&item.user_text), reply);
        let plan = split_reply(&text);
        for chunk in &plan {
            self.sender
                .deliver(destination, chunk)
                .await
                .map_err(ItemFailure::Delivery)?;
        }
        Ok(plan.len())
    }

    /// One best-effort status message; a failure or panic here is only logged
    async fn notify(&self, item: &QueueItem<S::Destination>, message: &str) {
        let chunk = Chunk::plain(message);
        let sent = AssertUnwindSafe(self.sender.deliver(&item.context.destination, &chunk))
            .catch_unwind()
            .await;
        match sent {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(
                "[{}] Could not report failure to {}: {e:#}",
                item.request_id, item.context.destination
            ),
            Err(panic) => error!(
                "[{}] Failure report to {} panicked: {}",
                item.request_id,
                item.context.destination,
                panic_reason(panic.as_ref())
            ),
        }
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
