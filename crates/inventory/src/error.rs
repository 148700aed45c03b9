//! Inventory error types.

use common::ProductId;
use thiserror::Error;

/// Errors that can occur during stock ledger operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// A referenced product has no stock record.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// Stock is too low to satisfy a reservation.
    #[error("insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Database error from the PostgreSQL store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row does not satisfy the ledger's invariants.
    #[error("corrupt stock data: {0}")]
    Corrupt(String),
}
