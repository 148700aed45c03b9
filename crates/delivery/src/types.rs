//! Delivery record and status state machine.

use chrono::{DateTime, Utc};
use common::{CustomerId, DeliveryId, OrderId};
use serde::{Deserialize, Serialize};

/// The state of a delivery in its lifecycle.
///
/// State transitions:
/// ```text
/// PENDING ──► IN_TRANSIT ──► DELIVERED
///    │            │
///    └────────────┴──► FAILED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    /// Created from a fulfillment announcement, not yet picked up.
    #[default]
    Pending,

    /// On its way to the destination.
    InTransit,

    /// Arrived (terminal state).
    Delivered,

    /// Could not be completed (terminal state).
    Failed,
}

impl DeliveryStatus {
    /// Returns true if the state machine allows moving to `target`.
    pub fn can_transition_to(&self, target: DeliveryStatus) -> bool {
        matches!(
            (self, target),
            (DeliveryStatus::Pending, DeliveryStatus::InTransit)
                | (DeliveryStatus::Pending, DeliveryStatus::Failed)
                | (DeliveryStatus::InTransit, DeliveryStatus::Delivered)
                | (DeliveryStatus::InTransit, DeliveryStatus::Failed)
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Failed)
    }

    /// Returns the wire representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::InTransit => "IN_TRANSIT",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Failed => "FAILED",
        }
    }

    /// Parses a wire status value; invalid values are rejected before any
    /// mutation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(DeliveryStatus::Pending),
            "IN_TRANSIT" => Some(DeliveryStatus::InTransit),
            "DELIVERED" => Some(DeliveryStatus::Delivered),
            "FAILED" => Some(DeliveryStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A delivery owned by the delivery domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: DeliveryId,
    /// The order this delivery fulfills.
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub shipping_address: String,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    /// Creates a pending delivery for an order.
    pub fn for_order(
        order_id: OrderId,
        customer_id: CustomerId,
        shipping_address: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: DeliveryId::new(),
            order_id,
            customer_id,
            shipping_address: shipping_address.into(),
            status: DeliveryStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(DeliveryStatus::default(), DeliveryStatus::Pending);
    }

    #[test]
    fn test_allowed_transitions() {
        assert!(DeliveryStatus::Pending.can_transition_to(DeliveryStatus::InTransit));
        assert!(DeliveryStatus::Pending.can_transition_to(DeliveryStatus::Failed));
        assert!(DeliveryStatus::InTransit.can_transition_to(DeliveryStatus::Delivered));
        assert!(DeliveryStatus::InTransit.can_transition_to(DeliveryStatus::Failed));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!DeliveryStatus::Pending.can_transition_to(DeliveryStatus::Delivered));
        assert!(!DeliveryStatus::Pending.can_transition_to(DeliveryStatus::Pending));
        assert!(!DeliveryStatus::Delivered.can_transition_to(DeliveryStatus::Failed));
        assert!(!DeliveryStatus::Failed.can_transition_to(DeliveryStatus::InTransit));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!DeliveryStatus::Pending.is_terminal());
        assert!(!DeliveryStatus::InTransit.is_terminal());
        assert!(DeliveryStatus::Delivered.is_terminal());
        assert!(DeliveryStatus::Failed.is_terminal());
    }

    #[test]
    fn test_wire_values_roundtrip() {
        for status in [
            DeliveryStatus::Pending,
            DeliveryStatus::InTransit,
            DeliveryStatus::Delivered,
            DeliveryStatus::Failed,
        ] {
            assert_eq!(DeliveryStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DeliveryStatus::parse("SHIPPED"), None);
        assert_eq!(DeliveryStatus::parse("in_transit"), None);
    }

    #[test]
    fn test_serde_uses_wire_values() {
        let json = serde_json::to_string(&DeliveryStatus::InTransit).unwrap();
        assert_eq!(json, "\"IN_TRANSIT\"");
    }
}
