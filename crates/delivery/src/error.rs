//! Delivery error types.

use common::DeliveryId;
use thiserror::Error;

use crate::types::DeliveryStatus;

/// Errors that can occur during delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// No delivery with the given ID.
    #[error("delivery not found: {0}")]
    NotFound(DeliveryId),

    /// The requested status change is not allowed by the state machine.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    /// Database error from the PostgreSQL store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row does not map onto the delivery model.
    #[error("corrupt delivery data: {0}")]
    Corrupt(String),
}
