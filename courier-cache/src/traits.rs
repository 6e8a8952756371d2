//! Cache store trait definition.

use crate::error::CacheResult;
use async_trait::async_trait;
use std::time::Duration;

/// Storage contract for cached responses.
///
/// Values are opaque strings; callers serialize before `set` and decode
/// after `get`. Expiry is lazy: a store never sweeps in the background, it
/// treats an entry as gone once its TTL has run out.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value from the cache.
    ///
    /// Returns `Ok(None)` if the key is absent or expired.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a value for `ttl`, replacing any previous value for `key`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Check if a live value exists for `key`.
    ///
    /// An expired entry is evicted and reported as missing.
    async fn has(&self, key: &str) -> CacheResult<bool>;

    /// Delete a key from the cache.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Clear all keys from the cache.
    async fn clear(&self) -> CacheResult<()>;

    /// Remaining time-to-live of a live key.
    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>>;
}
