//! Request/response layered over one-way queues.
//!
//! A caller registers a correlation id in the pending table, publishes the
//! request, and waits. The response consumer resolves entries by correlation
//! id. Exactly one of {reply, timeout} wins: both paths remove the table
//! entry first, so the loser finds nothing and resolution cannot happen
//! twice.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::{Mutex, oneshot};
use uuid::Uuid;

use crate::bus::MessageBus;
use crate::envelope::StockCheckResponse;
use crate::error::MessagingError;

/// Default deadline for a pending request.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors surfaced to the waiting caller.
#[derive(Debug, Error)]
pub enum RpcError {
    /// No reply arrived before the deadline.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The request could not be serialized.
    #[error("request serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The request could not be published.
    #[error(transparent)]
    Publish(#[from] MessagingError),

    /// The response consumer went away before resolving the entry.
    #[error("reply channel closed before resolution")]
    ChannelClosed,
}

/// Reply payloads that carry the correlation id of their request.
pub trait Correlated {
    fn correlation_id(&self) -> Uuid;
}

impl Correlated for StockCheckResponse {
    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

type PendingTable<R> = Arc<Mutex<HashMap<Uuid, oneshot::Sender<R>>>>;

/// Correlated RPC client over a request/response subject pair.
pub struct RpcClient<R> {
    bus: Arc<dyn MessageBus>,
    request_subject: String,
    pending: PendingTable<R>,
    timeout: Duration,
}

impl<R> RpcClient<R>
where
    R: Correlated + DeserializeOwned + Send + 'static,
{
    /// Subscribes the response consumer and returns a ready client.
    ///
    /// The consumer task runs until the bus closes the response stream.
    pub async fn start(
        bus: Arc<dyn MessageBus>,
        request_subject: &str,
        response_subject: &str,
        timeout: Duration,
    ) -> Result<Self, MessagingError> {
        let pending: PendingTable<R> = Arc::new(Mutex::new(HashMap::new()));

        let mut responses = bus.subscribe(response_subject).await?;
        let table = pending.clone();
        tokio::spawn(async move {
            while let Some(payload) = responses.next().await {
                match serde_json::from_slice::<R>(&payload) {
                    Ok(reply) => {
                        let id = reply.correlation_id();
                        let entry = table.lock().await.remove(&id);
                        match entry {
                            Some(tx) => {
                                // A racing timeout may have dropped the
                                // receiver already; that is the no-op case.
                                let _ = tx.send(reply);
                            }
                            None => {
                                tracing::debug!(
                                    correlation_id = %id,
                                    "discarding late or duplicate reply"
                                );
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping malformed rpc reply");
                    }
                }
            }
            tracing::debug!("rpc response stream closed");
        });

        Ok(Self {
            bus,
            request_subject: request_subject.to_string(),
            pending,
            timeout,
        })
    }

    /// Publishes `request` and waits for the reply carrying `correlation_id`.
    #[tracing::instrument(skip(self, request))]
    pub async fn call<Q: Serialize + Sync>(
        &self,
        correlation_id: Uuid,
        request: &Q,
    ) -> Result<R, RpcError> {
        let payload = serde_json::to_vec(request)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(correlation_id, tx);

        if let Err(e) = self.bus.publish(&self.request_subject, payload).await {
            self.pending.lock().await.remove(&correlation_id);
            return Err(e.into());
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(RpcError::ChannelClosed),
            Err(_) => {
                metrics::counter!("rpc_timeouts_total").increment(1);
                self.pending.lock().await.remove(&correlation_id);
                Err(RpcError::Timeout(self.timeout))
            }
        }
    }

    /// Number of requests currently awaiting a reply.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
