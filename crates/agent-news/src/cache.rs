//! Short-lived cache for provider lookups
//!
//! Company-name lookups and discussion searches are repeated across news and
//! sentiment calls for the same ticker; caching them avoids burning API quota.

use cached::{Cached, TimedCache};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cache key for provider lookups
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Ticker or query the lookup is about
    pub subject: String,
    /// Lookup kind (e.g. "company_name", "discussions")
    pub endpoint: String,
    /// Additional parameters as JSON string
    pub params: String,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(subject: impl Into<String>, endpoint: impl Into<String>, params: impl Serialize) -> Self {
        Self {
            subject: subject.into(),
            endpoint: endpoint.into(),
            params: serde_json::to_string(&params).unwrap_or_default(),
        }
    }
}

/// Thread-safe TTL cache of JSON values
#[derive(Clone)]
pub struct ResponseCache {
    cache: Arc<RwLock<TimedCache<CacheKey, serde_json::Value>>>,
}

impl ResponseCache {
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Get a value from the cache
    pub async fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        let mut cache = self.cache.write().await;
        cache.cache_get(key).cloned()
    }

    /// Insert a value into the cache
    pub async fn insert(&self, key: CacheKey, value: serde_json::Value) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key, value);
    }

    /// Get a typed value, or fetch and cache it
    ///
    /// Entries that fail to deserialize are treated as misses. Errors from
    /// the fetcher are returned and nothing is cached.
    pub async fn get_or_fetch<T, F, Fut, E>(&self, key: CacheKey, fetcher: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(&key).await {
            if let Ok(hit) = serde_json::from_value::<T>(value) {
                tracing::debug!("Cache hit for key: {:?}", key);
                return Ok(hit);
            }
        }

        tracing::debug!("Cache miss for key: {:?}", key);
        let value = fetcher().await?;

        if let Ok(json) = serde_json::to_value(&value) {
            self.insert(key, json).await;
        }

        Ok(value)
    }

    /// Get the number of cached entries
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
