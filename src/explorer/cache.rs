use std::num::NonZeroUsize;

use lru::LruCache;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    inserted_at: Instant,
}

/// Short-lived memo of upstream `result` payloads keyed by endpoint and
/// normalized query parameters.
///
/// The TTL is meant to span one multi-call analysis. Expired entries are
/// evicted on lookup and never returned.
#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::new(ttl, DEFAULT_CAPACITY)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Builds the lookup key. Parameter order does not matter and the API key
    /// never becomes part of it.
    pub fn cache_key(endpoint: &str, params: &[(&str, String)]) -> String {
        let mut pairs: Vec<_> = params
            .iter()
            .filter(|(name, _)| *name != "apikey")
            .map(|(name, value)| format!("{}={}", name, value.to_ascii_lowercase()))
            .collect();
        pairs.sort();
        format!("{}?{}", endpoint, pairs.join("&"))
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                return Some(entry.payload.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
        }
        None
    }

    pub async fn insert(&self, key: String, payload: Value) {
        self.entries.lock().await.put(
            key,
            CacheEntry {
                payload,
                inserted_at: Instant::now(),
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}
