//! JSON wire envelopes.
//!
//! Field names are camelCase and event messages are dispatched on their
//! `type` tag; unrecognized tags deserialize to [`EventMessage::Unknown`] so
//! a consumer loop can log and move on instead of crashing.

use chrono::{DateTime, Utc};
use common::{CustomerId, DeliveryId, OrderId, ProductId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product and quantity pair, used by checks and reservations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemQuantity {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Per-item outcome of an availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityStatus {
    pub product_id: ProductId,
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stock: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AvailabilityStatus {
    /// An available item with its current stock level.
    pub fn available(product_id: ProductId, current_stock: u32) -> Self {
        Self {
            product_id,
            available: true,
            current_stock: Some(current_stock),
            reason: None,
        }
    }

    /// An unavailable item with the reason it cannot be supplied.
    pub fn unavailable(
        product_id: ProductId,
        current_stock: Option<u32>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            product_id,
            available: false,
            current_stock,
            reason: Some(reason.into()),
        }
    }
}

/// Stock availability query, published to the request queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockCheckRequest {
    pub correlation_id: Uuid,
    pub items: Vec<ItemQuantity>,
}

/// Reply to a [`StockCheckRequest`], matched by correlation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockCheckResponse {
    pub correlation_id: Uuid,
    /// True when every requested item is available.
    pub available: bool,
    pub items: Vec<AvailabilityStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable_items: Option<Vec<AvailabilityStatus>>,
}

/// One-way stock reservation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    pub order_id: OrderId,
    pub items: Vec<ItemQuantity>,
}

/// Type-tagged event messages carried on the fulfillment and delivery-status
/// queues.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventMessage {
    /// Fulfillment announcement: a new order exists and needs a delivery.
    #[serde(rename = "ORDER_CREATED", rename_all = "camelCase")]
    OrderCreated {
        order_id: OrderId,
        customer_id: CustomerId,
        shipping_address: String,
        items: Vec<ItemQuantity>,
        total_amount: i64,
        created_at: DateTime<Utc>,
    },

    /// A delivery changed status; sales updates the order to match.
    #[serde(rename = "DELIVERY_STATUS_UPDATE", rename_all = "camelCase")]
    DeliveryStatusUpdate {
        order_id: OrderId,
        status: String,
        delivery_id: DeliveryId,
        timestamp: DateTime<Utc>,
    },

    /// Any message with an unrecognized `type` tag.
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_message_order_created_wire_format() {
        let msg = EventMessage::OrderCreated {
            order_id: OrderId::new(),
            customer_id: CustomerId::new(),
            shipping_address: "1 Main St".to_string(),
            items: vec![ItemQuantity {
                product_id: ProductId::new("SKU-001"),
                quantity: 2,
            }],
            total_amount: 2000,
            created_at: Utc::now(),
        };

        let json: serde_json::Value = serde_json::from_slice(&serde_json::to_vec(&msg).unwrap())
            .unwrap();
        assert_eq!(json["type"], "ORDER_CREATED");
        assert!(json["orderId"].is_string());
        assert_eq!(json["items"][0]["productId"], "SKU-001");
        assert_eq!(json["totalAmount"], 2000);
    }

    #[test]
    fn test_event_message_unknown_type_falls_back() {
        let raw = r#"{"type":"SOMETHING_ELSE","orderId":"x"}"#;
        let msg: EventMessage = serde_json::from_str(raw).unwrap();
        assert!(matches!(msg, EventMessage::Unknown));
    }

    #[test]
    fn test_stock_check_response_roundtrip() {
        let resp = StockCheckResponse {
            correlation_id: Uuid::new_v4(),
            available: false,
            items: vec![AvailabilityStatus::available(ProductId::new("A"), 10)],
            unavailable_items: Some(vec![AvailabilityStatus::unavailable(
                ProductId::new("B"),
                Some(1),
                "insufficient stock",
            )]),
        };

        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("correlationId"));
        assert!(json.contains("unavailableItems"));

        let back: StockCheckResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.correlation_id, resp.correlation_id);
        assert_eq!(back.items, resp.items);
    }

    #[test]
    fn test_availability_status_omits_empty_fields() {
        let status = AvailabilityStatus::unavailable(ProductId::new("X"), None, "not found");
        let json = serde_json::to_string(&status).unwrap();
        assert!(!json.contains("currentStock"));
        assert!(json.contains("not found"));
    }
}
