//! Shared types used across the sales, inventory, and delivery services.

mod types;

pub use types::{CustomerId, DeliveryId, Money, OrderId, ProductId};
