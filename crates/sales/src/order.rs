//! Order model and status state machine.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};

/// The state of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// PendingShipment ──► Shipped ──► Delivered
///        │
///        └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Created and announced for fulfillment, not yet shipped.
    #[default]
    PendingShipment,

    /// The delivery is in transit.
    Shipped,

    /// The delivery arrived (terminal state).
    Delivered,

    /// The order was cancelled (terminal state); only reachable from
    /// `PendingShipment`.
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the state machine allows moving to `target`.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        matches!(
            (self, target),
            (OrderStatus::PendingShipment, OrderStatus::Shipped)
                | (OrderStatus::PendingShipment, OrderStatus::Cancelled)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingShipment => "PendingShipment",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Parses a status name from an API request.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PendingShipment" => Some(OrderStatus::PendingShipment),
            "Shipped" => Some(OrderStatus::Shipped),
            "Delivered" => Some(OrderStatus::Delivered),
            "Cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Maps a delivery-status wire value onto the order status it propagates
    /// to.
    pub fn from_delivery_wire(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OrderStatus::PendingShipment),
            "IN_TRANSIT" => Some(OrderStatus::Shipped),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "FAILED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A line in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price per unit.
    pub unit_price: Money,
    /// `unit_price * quantity`, computed at creation.
    pub line_total: Money,
}

impl OrderLine {
    /// Creates a line with its total computed from quantity and unit price.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
            line_total: unit_price.multiply(quantity),
        }
    }
}

/// An order owned by the sales domain.
///
/// Created atomically with its lines; mutated only by the creation insert
/// and by status transitions. Never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub shipping_address: String,
    pub total: Money,
    pub currency: String,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order with its total computed from the lines.
    pub fn create(
        customer_id: CustomerId,
        shipping_address: impl Into<String>,
        currency: impl Into<String>,
        lines: Vec<OrderLine>,
    ) -> Self {
        let total = lines.iter().map(|l| l.line_total).sum();
        Self {
            id: OrderId::new(),
            customer_id,
            shipping_address: shipping_address.into(),
            total,
            currency: currency.into(),
            status: OrderStatus::default(),
            lines,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending_shipment() {
        assert_eq!(OrderStatus::default(), OrderStatus::PendingShipment);
    }

    #[test]
    fn test_allowed_transitions() {
        assert!(OrderStatus::PendingShipment.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::PendingShipment.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_cancelled_only_from_pending_shipment() {
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OrderStatus::PendingShipment.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_delivery_wire_mapping() {
        assert_eq!(
            OrderStatus::from_delivery_wire("PENDING"),
            Some(OrderStatus::PendingShipment)
        );
        assert_eq!(
            OrderStatus::from_delivery_wire("IN_TRANSIT"),
            Some(OrderStatus::Shipped)
        );
        assert_eq!(
            OrderStatus::from_delivery_wire("DELIVERED"),
            Some(OrderStatus::Delivered)
        );
        assert_eq!(
            OrderStatus::from_delivery_wire("FAILED"),
            Some(OrderStatus::Cancelled)
        );
        assert_eq!(OrderStatus::from_delivery_wire("LOST"), None);
    }

    #[test]
    fn test_order_total_computed_from_lines() {
        let order = Order::create(
            CustomerId::new(),
            "1 Main St",
            "USD",
            vec![
                OrderLine::new("SKU-001", 2, Money::from_cents(1000)),
                OrderLine::new("SKU-002", 1, Money::from_cents(2500)),
            ],
        );

        assert_eq!(order.total.cents(), 4500);
        assert_eq!(order.lines[0].line_total.cents(), 2000);
        assert_eq!(order.status, OrderStatus::PendingShipment);
    }
}
