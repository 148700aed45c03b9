//! Messaging error types.

use thiserror::Error;

/// Errors that can occur while talking to the broker.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// Broker connection could not be established.
    #[error("broker connection failed: {0}")]
    Connect(String),

    /// Publishing a message failed.
    #[error("publish to '{subject}' failed: {reason}")]
    Publish { subject: String, reason: String },

    /// Subscribing to a subject failed.
    #[error("subscribe to '{subject}' failed: {reason}")]
    Subscribe { subject: String, reason: String },

    /// A subject on the in-memory bus already has its consumer attached.
    #[error("subject '{0}' already has a subscriber")]
    AlreadySubscribed(String),

    /// A payload could not be serialized or deserialized.
    #[error("malformed message payload: {0}")]
    Malformed(#[from] serde_json::Error),
}
