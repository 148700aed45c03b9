//! Client-facing request deduplication.
//!
//! A mutating request carrying an `Idempotency-Key` executes at most once
//! within the cache's validity window: the first successful response is
//! stored under the key and replayed verbatim for any retry.
//!
//! Per key the state machine is `Unseen → Completed`. There is no
//! `InFlight` lock: two concurrent requests with the same unseen key may
//! both execute and both store their response, last write wins. That race
//! is bounded and never blocks a caller, which is why this implementation
//! keeps it (see DESIGN.md).
//!
//! The store is volatile. Losing it degrades to "no deduplication", never
//! to corruption.

mod cache;
mod key;

pub use cache::{DEFAULT_TTL, InMemoryResponseCache, ResponseCache, StoredResponse};
pub use key::{IdempotencyKey, KeyError, MAX_KEY_LENGTH};
