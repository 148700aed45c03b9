//! Message bus seam over the broker.
//!
//! Queue semantics: one consumer per subject, FIFO per subject, no ordering
//! across subjects. Durability is the broker's concern; the in-memory bus
//! buffers unconsumed messages for the lifetime of the process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio::sync::{Mutex, mpsc};

use crate::error::MessagingError;

/// Stream of raw message payloads from a subject.
pub type MessageStream = BoxStream<'static, Vec<u8>>;

/// One-way publish/subscribe over named subjects.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publishes a payload to a subject.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), MessagingError>;

    /// Attaches the consumer for a subject and returns its message stream.
    async fn subscribe(&self, subject: &str) -> Result<MessageStream, MessagingError>;
}

struct Topic {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    // Held until the subject's consumer attaches; publishes before that
    // accumulate in the channel.
    rx: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl Topic {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx: Some(rx) }
    }
}

/// In-memory bus for tests and single-process deployments.
///
/// Each subject is backed by an unbounded channel; exactly one subscriber
/// may attach per subject.
#[derive(Clone, Default)]
pub struct InMemoryBus {
    topics: Arc<Mutex<HashMap<String, Topic>>>,
}

impl InMemoryBus {
    /// Creates a new empty bus.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), MessagingError> {
        let mut topics = self.topics.lock().await;
        let topic = topics
            .entry(subject.to_string())
            .or_insert_with(Topic::new);

        topic
            .tx
            .send(payload)
            .map_err(|_| MessagingError::Publish {
                subject: subject.to_string(),
                reason: "subscriber dropped".to_string(),
            })
    }

    async fn subscribe(&self, subject: &str) -> Result<MessageStream, MessagingError> {
        let mut topics = self.topics.lock().await;
        let topic = topics
            .entry(subject.to_string())
            .or_insert_with(Topic::new);

        let rx = topic
            .rx
            .take()
            .ok_or_else(|| MessagingError::AlreadySubscribed(subject.to_string()))?;

        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|payload| (payload, rx))
        });
        Ok(stream.boxed())
    }
}

/// NATS-backed bus.
#[derive(Clone)]
pub struct NatsBus {
    client: async_nats::Client,
}

impl NatsBus {
    /// Connects to the broker at `url`.
    pub async fn connect(url: &str) -> Result<Self, MessagingError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| MessagingError::Connect(e.to_string()))?;
        tracing::info!(%url, "connected to NATS");
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageBus for NatsBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), MessagingError> {
        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| MessagingError::Publish {
                subject: subject.to_string(),
                reason: e.to_string(),
            })
    }

    async fn subscribe(&self, subject: &str) -> Result<MessageStream, MessagingError> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| MessagingError::Subscribe {
                subject: subject.to_string(),
                reason: e.to_string(),
            })?;

        Ok(subscriber.map(|msg| msg.payload.to_vec()).boxed())
    }
}
