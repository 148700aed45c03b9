//! Sales domain: orders and the fulfillment saga.
//!
//! Order creation runs the saga in [`coordinator`]; after that, order status
//! changes arrive only through the delivery-status consumer in
//! [`status_consumer`] (or an explicit status PATCH at the API).

pub mod availability;
pub mod coordinator;
pub mod error;
pub mod order;
pub mod postgres;
pub mod status_consumer;
pub mod store;

pub use availability::{AvailabilityChecker, RpcAvailabilityChecker, StaticAvailabilityChecker};
pub use coordinator::{FulfillmentCoordinator, LineRequest, PlaceOrder, PlacedOrder};
pub use error::SalesError;
pub use order::{Order, OrderLine, OrderStatus};
pub use postgres::PgOrderStore;
pub use status_consumer::DeliveryStatusConsumer;
pub use store::{InMemoryOrderStore, OrderStore};
