//! Inventory domain: the stock ledger.
//!
//! Stock quantities are mutated only through [`StockLedger::reserve`] and
//! [`StockLedger::release`], each of which appends an immutable
//! [`Movement`]. Replaying the movements for a product from its initial
//! level reproduces its current quantity exactly.

pub mod consumer;
pub mod error;
pub mod ledger;
pub mod postgres;
pub mod store;
pub mod types;

pub use consumer::{ReservationConsumer, StockCheckResponder};
pub use error::InventoryError;
pub use ledger::StockLedger;
pub use postgres::PgStockStore;
pub use store::{InMemoryStockStore, StockStore};
pub use types::{Movement, MovementReason, MovementReceipt, StockRecord};
