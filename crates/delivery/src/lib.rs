//! Delivery domain.
//!
//! Deliveries are created from fulfillment announcements and move through
//! `PENDING → IN_TRANSIT → DELIVERED` (or `FAILED` from any non-terminal
//! state). Every successful status change emits a best-effort propagation
//! message consumed by the sales service.

pub mod consumer;
pub mod error;
pub mod postgres;
pub mod service;
pub mod store;
pub mod types;

pub use consumer::FulfillmentConsumer;
pub use error::DeliveryError;
pub use postgres::PgDeliveryStore;
pub use service::DeliveryService;
pub use store::{DeliveryStore, InMemoryDeliveryStore};
pub use types::{Delivery, DeliveryStatus};
