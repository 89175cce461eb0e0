//! FIFO hand-off between producers (command handlers, the passive listener)
//! and the single dispatch worker.
//!
//! Admission order is assigned under the same lock as the channel send, so
//! the order numbers seen by the worker are strictly increasing no matter
//! how many producers race. Every admitted item is counted as pending until
//! its [`Ack`] drops.

use crate::core::profile::UserProfile;
use log::debug;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

/// The user a request came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub user_id: u64,
    /// Stored profile, looked up by the producer before enqueueing
    pub profile: Option<UserProfile>,
}

impl Requester {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            profile: None,
        }
    }

    pub fn with_profile(mut self, profile: Option<UserProfile>) -> Self {
        self.profile = profile;
        self
    }
}

/// Where a reply goes and who asked for it
#[derive(Debug, Clone)]
pub struct RequestContext<D> {
    pub destination: D,
    /// `None` for system traffic such as startup priming
    pub requester: Option<Requester>,
}

impl<D> RequestContext<D> {
    pub fn new(destination: D, requester: Requester) -> Self {
        Self {
            destination,
            requester: Some(requester),
        }
    }

    pub fn system(destination: D) -> Self {
        Self {
            destination,
            requester: None,
        }
    }

    /// Quote of the request placed above the reply
    pub fn header(&self, user_text: &str) -> String {
        match &self.requester {
            None => String::new(),
            Some(requester) => {
                let mut header = format!("> **{user_text}** - <@{}> \n\n", requester.user_id);
                if let Some(profile) = &requester.profile {
                    header.push_str(&profile.greeting());
                }
                header
            }
        }
    }

    /// Text actually sent to the backend
    pub fn backend_prompt(&self, user_text: &str) -> String {
        match self.requester.as_ref().and_then(|r| r.profile.as_ref()) {
            Some(profile) => profile.augment_prompt(user_text),
            None => user_text.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueueItem<D> {
    pub context: RequestContext<D>,
    pub user_text: String,
    /// Position in admission order, starting at 0
    pub order: u64,
    pub request_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("dispatch worker is no longer receiving")]
pub struct QueueClosed;

struct QueueState {
    next_order: Mutex<u64>,
    pending: watch::Sender<usize>,
}

impl QueueState {
    fn adjust_pending(&self, admitted: bool) {
        self.pending.send_modify(|n| {
            *n = if admitted { *n + 1 } else { n.saturating_sub(1) };
        });
    }
}

/// Producer handle. Cheap to clone; never blocks.
pub struct DispatchQueue<D> {
    tx: mpsc::UnboundedSender<QueueItem<D>>,
    state: Arc<QueueState>,
}

impl<D> Clone for DispatchQueue<D> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            state: self.state.clone(),
        }
    }
}

/// Consumer handle, owned by the one worker
pub struct DispatchReceiver<D> {
    rx: mpsc::UnboundedReceiver<QueueItem<D>>,
    state: Arc<QueueState>,
}

/// Completion token for one dequeued item. Dropping it acknowledges the
/// item, on every exit path.
pub struct Ack {
    state: Arc<QueueState>,
    order: u64,
}

impl Drop for Ack {
    fn drop(&mut self) {
        self.state.adjust_pending(false);
        debug!("Acknowledged queue item #{}", self.order);
    }
}

pub fn dispatch_queue<D>() -> (DispatchQueue<D>, DispatchReceiver<D>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (pending, _) = watch::channel(0usize);
    let state = Arc::new(QueueState {
        next_order: Mutex::new(0),
        pending,
    });
    (
        DispatchQueue {
            tx,
            state: state.clone(),
        },
        DispatchReceiver { rx, state },
    )
}

impl<D> DispatchQueue<D> {
    /// Append a request and return its admission order
    pub fn enqueue(
        &self,
        context: RequestContext<D>,
        user_text: impl Into<String>,
    ) -> Result<u64, QueueClosed> {
        let mut next = self
            .state
            .next_order
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let order = *next;
        let item = QueueItem {
            context,
            user_text: user_text.into(),
            order,
            request_id: Uuid::new_v4(),
        };

        self.state.adjust_pending(true);
        if self.tx.send(item).is_err() {
            self.state.adjust_pending(false);
            return Err(QueueClosed);
        }
        *next += 1;
        Ok(order)
    }

    /// Items admitted but not yet acknowledged
    pub fn pending(&self) -> usize {
        *self.state.pending.borrow()
    }

    /// Wait until every admitted item has been acknowledged
    pub async fn join(&self) {
        let mut rx = self.state.pending.subscribe();
        // The sender lives in `state`, which we hold, so this cannot close
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl<D> DispatchReceiver<D> {
    /// Next item in admission order. `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<(QueueItem<D>, Ack)> {
        let item = self.rx.recv().await?;
        let ack = Ack {
            state: self.state.clone(),
            order: item.order,
        };
        Some((item, ack))
    }
}
