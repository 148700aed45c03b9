//! Volatile response cache with TTL expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::key::IdempotencyKey;

/// How long a completed record replays before expiring.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// The full outcome of the first successful execution under a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Store seam for completed responses.
///
/// Implementations degrade to a no-op on backend failure: a `get` miss or a
/// dropped `put` just means the retry executes again.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Returns the stored response for a key, if present and unexpired.
    async fn get(&self, key: &IdempotencyKey) -> Option<StoredResponse>;

    /// Stores the response for a key. Callers only store success-range
    /// responses.
    async fn put(&self, key: IdempotencyKey, response: StoredResponse);
}

struct Entry {
    response: StoredResponse,
    expires_at: Instant,
}

/// In-memory response cache with lazy expiry.
#[derive(Clone)]
pub struct InMemoryResponseCache {
    entries: Arc<RwLock<HashMap<IdempotencyKey, Entry>>>,
    ttl: Duration,
}

impl InMemoryResponseCache {
    /// Creates a cache with the default 24-hour TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Creates a cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Returns the number of stored entries, including expired ones not yet
    /// evicted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for InMemoryResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, key: &IdempotencyKey) -> Option<StoredResponse> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    metrics::counter!("idempotency_replays_total").increment(1);
                    return Some(entry.response.clone());
                }
                Some(_) => {} // expired, evict below
                None => return None,
            }
        }

        self.entries.write().await.remove(key);
        tracing::debug!(%key, "evicted expired idempotency record");
        None
    }

    async fn put(&self, key: IdempotencyKey, response: StoredResponse) {
        let entry = Entry {
            response,
            expires_at: Instant::now() + self.ttl,
        };
        // Last write wins for concurrent first executions of the same key.
        self.entries.write().await.insert(key, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &str) -> StoredResponse {
        StoredResponse {
            status: 201,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_get_miss_then_hit() {
        let cache = InMemoryResponseCache::new();
        let key = IdempotencyKey::parse("k1").unwrap();

        assert!(cache.get(&key).await.is_none());

        cache.put(key.clone(), response("{}")).await;
        let hit = cache.get(&key).await.unwrap();
        assert_eq!(hit.status, 201);
        assert_eq!(hit.body, b"{}");
    }

    #[tokio::test]
    async fn test_replay_is_verbatim() {
        let cache = InMemoryResponseCache::new();
        let key = IdempotencyKey::parse("k1").unwrap();
        let stored = response(r#"{"order_id":"abc"}"#);

        cache.put(key.clone(), stored.clone()).await;
        assert_eq!(cache.get(&key).await, Some(stored.clone()));
        assert_eq!(cache.get(&key).await, Some(stored));
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted() {
        let cache = InMemoryResponseCache::with_ttl(Duration::ZERO);
        let key = IdempotencyKey::parse("k1").unwrap();

        cache.put(key.clone(), response("{}")).await;
        assert!(cache.get(&key).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = InMemoryResponseCache::new();
        let key = IdempotencyKey::parse("k1").unwrap();

        cache.put(key.clone(), response("first")).await;
        cache.put(key.clone(), response("second")).await;

        assert_eq!(cache.get(&key).await.unwrap().body, b"second");
        assert_eq!(cache.len().await, 1);
    }
}
