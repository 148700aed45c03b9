//! Well-known queue subjects.
//!
//! Each subject carries exactly one envelope type; consumers treat anything
//! else on the subject as malformed and dead-letter it.

/// Stock availability queries published by the sales service.
pub const STOCK_CHECK_REQUEST: &str = "orders.stock.check.request";

/// Replies to stock availability queries, matched by correlation id.
pub const STOCK_CHECK_RESPONSE: &str = "orders.stock.check.response";

/// One-way stock reservation requests.
pub const STOCK_RESERVE: &str = "orders.stock.reserve";

/// Fulfillment announcements (`ORDER_CREATED`) consumed by delivery.
pub const FULFILLMENT: &str = "orders.fulfillment";

/// Delivery status changes (`DELIVERY_STATUS_UPDATE`) consumed by sales.
pub const DELIVERY_STATUS: &str = "orders.delivery.status";

/// Messages that could not be processed, kept for inspection.
pub const DEAD_LETTER: &str = "orders.dlq";
