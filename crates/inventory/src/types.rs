//! Stock ledger data types.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current stock position for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub product_id: ProductId,
    /// Current on-hand quantity; never negative.
    pub quantity: u32,
    /// Inactive products are reported unavailable without checking quantity.
    pub active: bool,
}

impl StockRecord {
    /// Creates an active stock record with the given starting quantity.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            active: true,
        }
    }
}

/// Why a movement happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementReason {
    ReservedForOrder,
    ReleasedFromCancelledOrder,
}

impl MovementReason {
    /// Returns the audit-trail reason tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReason::ReservedForOrder => "reserved for order",
            MovementReason::ReleasedFromCancelledOrder => "released from cancelled order",
        }
    }

    /// Parses a stored reason tag.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reserved for order" => Some(MovementReason::ReservedForOrder),
            "released from cancelled order" => Some(MovementReason::ReleasedFromCancelledOrder),
            _ => None,
        }
    }
}

impl std::fmt::Display for MovementReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable audit record of a stock quantity change.
///
/// Movements are append-only; for any product, replaying all movements in
/// creation order from its initial level reproduces the current quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: Uuid,
    pub product_id: ProductId,
    /// Signed quantity change: negative for reservations.
    pub delta: i64,
    pub previous_quantity: u32,
    pub new_quantity: u32,
    pub reason: MovementReason,
    /// The order that caused this movement.
    pub order_id: OrderId,
    pub created_at: DateTime<Utc>,
}

impl Movement {
    pub fn new(
        product_id: ProductId,
        delta: i64,
        previous_quantity: u32,
        new_quantity: u32,
        reason: MovementReason,
        order_id: OrderId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            delta,
            previous_quantity,
            new_quantity,
            reason,
            order_id,
            created_at: Utc::now(),
        }
    }
}

/// Per-item result of a successful reserve or release call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementReceipt {
    pub product_id: ProductId,
    /// Quantity moved by this entry.
    pub quantity: u32,
    pub previous_stock: u32,
    pub new_stock: u32,
}
