//! End-to-end tests for the dispatch pipeline: queue, worker, session and
//! personas, driven through a recording platform sender.

use anyhow::Result;
use async_trait::async_trait;
use relay::core::error::{BackendError, BackendErrorKind, POLICY_MESSAGE, TRANSPORT_MESSAGE};
use relay::core::response::{Chunk, CHUNK_LIMIT};
use relay::core::Session;
use relay::features::backend::{BackendFactory, ChatBackend, ChatModel};
use relay::features::dispatch::{
    dispatch_queue, ComposingGuard, DispatchQueue, DispatchWorker, ItemOutcome, PlatformSender,
    RequestContext, Requester,
};
use relay::features::startup::{enqueue_priming, Priming};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

const USER: u64 = 7;

/// Shared record of what the backend saw
#[derive(Default)]
struct Trace {
    events: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    generating: AtomicBool,
}

impl Trace {
    fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

/// Backend whose behaviour is picked by the request text
struct ScriptedBackend {
    trace: Arc<Trace>,
    prompt: String,
}

impl ScriptedBackend {
    fn new(trace: Arc<Trace>) -> Self {
        Self {
            trace,
            prompt: String::new(),
        }
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn model(&self) -> ChatModel {
        ChatModel::ApiKey
    }

    async fn generate_reply(&mut self, text: &str) -> Result<String, BackendError> {
        let now = self.trace.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.trace.max_active.fetch_max(now, Ordering::SeqCst);
        self.trace.generating.store(true, Ordering::SeqCst);
        self.trace.push(format!("start:{text}"));

        let result = match text {
            "fail:policy" => Err(BackendError::policy_rejected("content_filter")),
            "fail:transport" => Err(BackendError::transport("connection reset")),
            "panic" => panic!("backend exploded"),
            "long" => Ok("a".repeat(2500)),
            "slow" => {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(format!("{}|slow", self.prompt))
            }
            _ => {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(format!("{}|{text}", self.prompt))
            }
        };

        self.trace.push(format!("end:{text}"));
        self.trace.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn reset(&mut self) -> Result<(), BackendError> {
        self.prompt.clear();
        self.trace.push("reset");
        Ok(())
    }

    async fn with_system_prompt(&self, prompt: &str) -> Result<Box<dyn ChatBackend>, BackendError> {
        self.trace.push("system_prompt");
        Ok(Box::new(ScriptedBackend {
            trace: self.trace.clone(),
            prompt: prompt.to_string(),
        }))
    }
}

/// Records deliveries. Destinations starting with "broken" refuse delivery,
/// ones starting with "crashing" panic.
#[derive(Default)]
struct RecordingSender {
    delivered: Mutex<Vec<(String, Chunk)>>,
    composing: AtomicUsize,
}

impl RecordingSender {
    fn delivered(&self) -> Vec<(String, Chunk)> {
        self.delivered.lock().unwrap().clone()
    }

    fn texts_for(&self, destination: &str) -> Vec<String> {
        self.delivered()
            .into_iter()
            .filter(|(d, _)| d == destination)
            .map(|(_, c)| c.text)
            .collect()
    }
}

#[async_trait]
impl PlatformSender for RecordingSender {
    type Destination = String;

    async fn composing(&self, _destination: &String) -> Result<ComposingGuard> {
        self.composing.fetch_add(1, Ordering::SeqCst);
        Ok(ComposingGuard::noop())
    }

    async fn deliver(&self, destination: &String, chunk: &Chunk) -> Result<()> {
        if destination.starts_with("broken") {
            anyhow::bail!("channel {destination} is gone");
        }
        if destination.starts_with("crashing") {
            panic!("sender blew up on {destination}");
        }
        self.delivered
            .lock()
            .unwrap()
            .push((destination.clone(), chunk.clone()));
        Ok(())
    }
}

fn factory(trace: Arc<Trace>) -> BackendFactory {
    Arc::new(
        move |_model: ChatModel| -> Result<Box<dyn ChatBackend>, BackendError> {
            Ok(Box::new(ScriptedBackend::new(trace.clone())))
        },
    )
}

fn session(trace: &Arc<Trace>) -> Session {
    Session::new(
        Box::new(ScriptedBackend::new(trace.clone())),
        factory(trace.clone()),
    )
}

fn user_context(destination: &str) -> RequestContext<String> {
    RequestContext::new(destination.to_string(), Requester::new(USER))
}

fn header(text: &str) -> String {
    format!("> **{text}** - <@{USER}> \n\n")
}

struct Harness {
    trace: Arc<Trace>,
    session: Arc<Session>,
    sender: Arc<RecordingSender>,
    queue: DispatchQueue<String>,
    worker: JoinHandle<()>,
}

fn start(session: Session, trace: Arc<Trace>) -> Harness {
    let session = Arc::new(session);
    let sender = Arc::new(RecordingSender::default());
    let (queue, receiver) = dispatch_queue::<String>();
    let worker = tokio::spawn(DispatchWorker::new(session.clone(), sender.clone()).run(receiver));
    Harness {
        trace,
        session,
        sender,
        queue,
        worker,
    }
}

fn harness() -> Harness {
    let trace = Arc::new(Trace::default());
    start(session(&trace), trace)
}

async fn finish(h: Harness) -> (Arc<Trace>, Arc<RecordingSender>) {
    tokio::time::timeout(Duration::from_secs(5), h.queue.join())
        .await
        .expect("queue did not drain");
    drop(h.queue);
    tokio::time::timeout(Duration::from_secs(5), h.worker)
        .await
        .expect("worker did not stop")
        .unwrap();
    (h.trace, h.sender)
}

#[tokio::test]
async fn test_replies_follow_admission_order() {
    let h = harness();
    for i in 0..5 {
        h.queue.enqueue(user_context("chan"), format!("m{i}")).unwrap();
    }
    let (trace, sender) = finish(h).await;

    let expected: Vec<String> = (0..5).map(|i| format!("{}|m{i}", header(&format!("m{i}")))).collect();
    assert_eq!(sender.texts_for("chan"), expected);
    assert_eq!(sender.composing.load(Ordering::SeqCst), 5);
    assert_eq!(trace.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_producers_never_overlap_backend_calls() {
    let h = harness();
    let mut producers = Vec::new();
    for p in 0..4 {
        let queue = h.queue.clone();
        producers.push(tokio::spawn(async move {
            for i in 0..5 {
                queue.enqueue(user_context(&format!("p{p}")), format!("{p}-{i}")).unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }
    let (trace, sender) = finish(h).await;

    assert_eq!(trace.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(sender.delivered().len(), 20);
    // Each producer's own requests come back in the order it sent them
    for p in 0..4 {
        let replies = sender.texts_for(&format!("p{p}"));
        let expected: Vec<String> = (0..5)
            .map(|i| format!("{}|{p}-{i}", header(&format!("{p}-{i}"))))
            .collect();
        assert_eq!(replies, expected);
    }
}

#[tokio::test]
async fn test_backend_failure_does_not_stop_the_loop() {
    let h = harness();
    h.queue.enqueue(user_context("chan"), "first").unwrap();
    h.queue.enqueue(user_context("chan"), "fail:transport").unwrap();
    h.queue.enqueue(user_context("chan"), "second").unwrap();
    let (_, sender) = finish(h).await;

    assert_eq!(
        sender.texts_for("chan"),
        vec![
            format!("{}|first", header("first")),
            TRANSPORT_MESSAGE.to_string(),
            format!("{}|second", header("second")),
        ]
    );
}

#[tokio::test]
async fn test_policy_rejection_sends_exactly_one_message() {
    let h = harness();
    h.queue.enqueue(user_context("chan"), "fail:policy").unwrap();
    let (_, sender) = finish(h).await;

    assert_eq!(sender.texts_for("chan"), vec![POLICY_MESSAGE.to_string()]);
}

#[tokio::test]
async fn test_panicking_item_is_isolated() {
    let h = harness();
    h.queue.enqueue(user_context("chan"), "panic").unwrap();
    h.queue.enqueue(user_context("chan"), "after").unwrap();
    let (_, sender) = finish(h).await;

    assert_eq!(
        sender.texts_for("chan"),
        vec![
            TRANSPORT_MESSAGE.to_string(),
            format!("{}|after", header("after")),
        ]
    );
}

#[tokio::test]
async fn test_delivery_failure_is_still_acknowledged() {
    let h = harness();
    h.queue.enqueue(user_context("broken-chan"), "lost").unwrap();
    h.queue.enqueue(user_context("chan"), "kept").unwrap();
    let (_, sender) = finish(h).await;

    assert!(sender.texts_for("broken-chan").is_empty());
    assert_eq!(sender.texts_for("chan"), vec![format!("{}|kept", header("kept"))]);
}

#[tokio::test]
async fn test_panicking_sender_does_not_kill_worker() {
    let h = harness();
    h.queue.enqueue(user_context("crashing-chan"), "first").unwrap();
    h.queue.enqueue(user_context("chan"), "second").unwrap();
    let (trace, sender) = finish(h).await;

    assert!(trace.events().contains(&"end:second".to_string()));
    assert!(sender.texts_for("crashing-chan").is_empty());
    assert_eq!(sender.texts_for("chan"), vec![format!("{}|second", header("second"))]);
}

#[tokio::test]
async fn test_process_reports_outcomes() {
    let trace = Arc::new(Trace::default());
    let session = Arc::new(session(&trace));
    let sender = Arc::new(RecordingSender::default());
    let worker = DispatchWorker::new(session.clone(), sender.clone());
    let (queue, mut receiver) = dispatch_queue::<String>();

    for (destination, text) in [
        ("chan", "long"),
        ("chan", "fail:policy"),
        ("broken", "hello"),
        ("chan", "panic"),
    ] {
        queue.enqueue(user_context(destination), text).unwrap();
    }

    let mut outcomes = Vec::new();
    for _ in 0..4 {
        let (item, _ack) = receiver.recv().await.unwrap();
        outcomes.push(worker.process(&item).await);
    }
    assert_eq!(
        outcomes,
        vec![
            ItemOutcome::Delivered(2),
            ItemOutcome::BackendFailed(BackendErrorKind::PolicyRejected),
            ItemOutcome::DeliveryFailed,
            ItemOutcome::Panicked,
        ]
    );
    assert_eq!(queue.pending(), 0);
    assert_eq!(session.active_destination(), None);
}

#[tokio::test]
async fn test_long_reply_is_chunked_in_order_under_the_header() {
    let h = harness();
    h.queue.enqueue(user_context("chan"), "long").unwrap();
    let (_, sender) = finish(h).await;

    let chunks = sender.texts_for("chan");
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].starts_with(&header("long")));
    assert!(chunks.iter().all(|c| c.chars().count() <= CHUNK_LIMIT));
    assert_eq!(chunks.concat(), format!("{}{}", header("long"), "a".repeat(2500)));
}

#[tokio::test]
async fn test_persona_switch_waits_for_in_flight_reply() {
    let h = harness();
    h.queue.enqueue(user_context("chan"), "slow").unwrap();

    while !h.trace.generating.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    h.session.switch_persona("chef").await.unwrap();
    assert_eq!(h.session.current_persona(), "chef");

    h.queue.enqueue(user_context("chan"), "after").unwrap();
    let session = h.session.clone();
    let (trace, sender) = finish(h).await;

    let events = trace.events();
    let end_slow = events.iter().position(|e| e == "end:slow").unwrap();
    let switched = events.iter().position(|e| e == "system_prompt").unwrap();
    assert!(end_slow < switched, "switch landed mid-request: {events:?}");

    // The request in flight used the old prompt, the next one the new persona
    let replies = sender.texts_for("chan");
    assert_eq!(replies[0], format!("{}|slow", header("slow")));
    let chef = session.personas().catalog().get("chef").unwrap().system_prompt.clone();
    assert_eq!(replies[1], format!("{}{chef}|after", header("after")));
}

#[tokio::test]
async fn test_priming_is_answered_before_user_traffic() {
    let trace = Arc::new(Trace::default());
    let session = session(&trace).with_startup_prompt("Be brief.", Some(99));
    let session = Arc::new(session);
    let sender = Arc::new(RecordingSender::default());
    let (queue, receiver) = dispatch_queue::<String>();

    assert_eq!(
        enqueue_priming(&queue, &session, |id| format!("channel-{id}")).unwrap(),
        Priming::Enqueued(0)
    );
    queue.enqueue(user_context("chan"), "hi").unwrap();

    let worker = tokio::spawn(DispatchWorker::new(session.clone(), sender.clone()).run(receiver));
    queue.join().await;
    drop(queue);
    worker.await.unwrap();

    let delivered = sender.delivered();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].0, "channel-99");
    // System traffic carries no quote header
    assert_eq!(delivered[0].1.text, "|Be brief.");
    assert_eq!(delivered[1].1.text, format!("{}|hi", header("hi")));
}

#[tokio::test]
async fn test_reset_drops_persona_and_queue_keeps_working() {
    let h = harness();
    h.session.switch_persona("zen").await.unwrap();
    h.session.reset().await.unwrap();
    assert_eq!(h.session.current_persona(), "standard");

    h.queue.enqueue(user_context("chan"), "hello").unwrap();
    let (trace, sender) = finish(h).await;

    assert!(trace.events().contains(&"reset".to_string()));
    assert_eq!(sender.texts_for("chan"), vec![format!("{}|hello", header("hello"))]);
}
