//! Dead-letter queue for unprocessable messages.
//!
//! Consumers push payloads they cannot parse or apply; the entries keep the
//! original subject and error so an operator can inspect and replay them.
//! Pushing is best-effort and never propagates a failure into the consumer
//! loop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bus::MessageBus;
use crate::subjects;

/// A message that could not be processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    /// Subject the message was originally consumed from.
    pub original_subject: String,
    /// Error from the failed processing attempt.
    pub error: String,
    /// Original payload, lossily decoded for inspection.
    pub payload: String,
    pub dead_lettered_at: DateTime<Utc>,
}

/// Publisher half of the dead-letter queue.
#[derive(Clone)]
pub struct DeadLetterQueue {
    bus: Arc<dyn MessageBus>,
}

impl DeadLetterQueue {
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self { bus }
    }

    /// Records a message that failed processing.
    pub async fn push(&self, original_subject: &str, payload: &[u8], error: &str) {
        let entry = DeadLetter {
            original_subject: original_subject.to_string(),
            error: error.to_string(),
            payload: String::from_utf8_lossy(payload).into_owned(),
            dead_lettered_at: Utc::now(),
        };

        metrics::counter!("dead_letters_total").increment(1);
        tracing::warn!(
            subject = original_subject,
            error,
            "dead-lettering unprocessable message"
        );

        match serde_json::to_vec(&entry) {
            Ok(bytes) => {
                if let Err(e) = self.bus.publish(subjects::DEAD_LETTER, bytes).await {
                    tracing::error!(error = %e, "failed to publish dead letter");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize dead letter"),
        }
    }
}
