//! Queue plumbing shared by the sales, inventory, and delivery services.
//!
//! The broker is reached through the [`MessageBus`] seam: [`NatsBus`] for
//! deployments, [`InMemoryBus`] for tests and single-process runs. On top of
//! the one-way queues this crate layers the correlated request/response
//! client ([`RpcClient`]) and the dead-letter queue for unprocessable
//! payloads.

pub mod bus;
pub mod dlq;
pub mod envelope;
pub mod error;
pub mod rpc;
pub mod subjects;

pub use bus::{InMemoryBus, MessageBus, MessageStream, NatsBus};
pub use dlq::{DeadLetter, DeadLetterQueue};
pub use error::MessagingError;
pub use rpc::{Correlated, RpcClient, RpcError};
