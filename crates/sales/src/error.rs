//! Sales error types.

use common::{OrderId, ProductId};
use messaging::envelope::AvailabilityStatus;
use thiserror::Error;

use crate::order::OrderStatus;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum SalesError {
    /// No order with the given ID.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// An order must contain at least one line.
    #[error("order has no lines")]
    NoLines,

    /// Line quantities must be positive.
    #[error("invalid quantity for {product_id}: {quantity}")]
    InvalidQuantity {
        product_id: ProductId,
        quantity: u32,
    },

    /// One or more requested lines cannot be supplied; nothing was
    /// persisted.
    #[error("{} unavailable item(s)", .0.len())]
    ItemsUnavailable(Vec<AvailabilityStatus>),

    /// The requested status change is not allowed by the state machine.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    /// The cross-service availability check did not complete.
    #[error("availability check failed: {0}")]
    AvailabilityCheck(String),

    /// Database error from the PostgreSQL store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row does not map onto the order model.
    #[error("corrupt order data: {0}")]
    Corrupt(String),
}
