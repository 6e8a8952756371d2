//! In-memory cache store.

use crate::error::CacheResult;
use crate::traits::CacheStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::trace;

/// Longest lifetime an entry can be given; longer TTLs are clamped.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Process-local cache with lazy expiration.
///
/// Entries expire once the clock reaches their deadline; they are dropped
/// the next time `get`, `has` or `delete` touches them, or on
/// `purge_expired`.
/// Clones share the same storage.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    data: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

#[derive(Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

impl InMemoryCache {
    /// Create new in-memory cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.data
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    /// Whether the cache holds no live entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every expired entry, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut data = self.data.write().await;
        let before = data.len();
        data.retain(|_, entry| entry.is_live(now));
        before - data.len()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        {
            let data = self.data.read().await;
            match data.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut data = self.data.write().await;
        if data.get(key).is_some_and(|entry| !entry.is_live(now)) {
            data.remove(key);
            trace!(key, "Evicted expired cache entry");
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(MAX_TTL))
            .unwrap_or(now);
        trace!(key, ttl = ?ttl, "Cache set");
        self.data
            .write()
            .await
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn has(&self, key: &str) -> CacheResult<bool> {
        let mut data = self.data.write().await;
        match data.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => Ok(true),
            Some(_) => {
                data.remove(key);
                trace!(key, "Evicted expired cache entry");
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.data.write().await.clear();
        Ok(())
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        let data = self.data.read().await;
        let now = Instant::now();
        Ok(data
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.expires_at - now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_set_and_get_until_expiry() {
        let cache = InMemoryCache::new();
        cache
            .set("key", "value".to_string(), Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(cache.get("key").await.unwrap(), Some("value".to_string()));

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(cache.has("key").await.unwrap());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("key").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_has_evicts_expired_entry() {
        let cache = InMemoryCache::new();
        cache
            .set("key", "value".to_string(), Duration::from_secs(1))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(!cache.has("key").await.unwrap());
        assert!(cache.data.read().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_evicts_expired_entry() {
        let cache = InMemoryCache::new();
        cache
            .set("key", "value".to_string(), Duration::from_secs(1))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.get("key").await.unwrap(), None);
        assert!(cache.data.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_huge_ttl_does_not_overflow() {
        let cache = InMemoryCache::new();
        cache
            .set("key", "value".to_string(), Duration::from_secs(u64::MAX))
            .await
            .unwrap();

        assert_eq!(cache.get("key").await.unwrap(), Some("value".to_string()));
        assert!(cache.ttl("key").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_zero_ttl_is_never_live() {
        let cache = InMemoryCache::new();
        cache
            .set("key", "value".to_string(), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(cache.get("key").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_len_counts_live_entries_only() {
        let cache = InMemoryCache::new();
        cache.set("short", "a".into(), Duration::from_secs(1)).await.unwrap();
        cache.set("long", "b".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.len().await, 2);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.len().await, 1);

        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_reports_remaining_time() {
        let cache = InMemoryCache::new();
        cache.set("key", "v".into(), Duration::from_secs(30)).await.unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.ttl("key").await.unwrap(), Some(Duration::from_secs(20)));
        assert_eq!(cache.ttl("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let cache = InMemoryCache::new();
        cache.set("a", "1".into(), Duration::from_secs(60)).await.unwrap();
        cache.set("b", "2".into(), Duration::from_secs(60)).await.unwrap();

        cache.delete("a").await.unwrap();
        assert!(!cache.has("a").await.unwrap());
        assert!(cache.has("b").await.unwrap());

        cache.clear().await.unwrap();
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let cache = InMemoryCache::new();
        cache.set("key", "old".into(), Duration::from_secs(60)).await.unwrap();
        cache.set("key", "new".into(), Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get("key").await.unwrap(), Some("new".to_string()));
        assert_eq!(cache.len().await, 1);
    }
}
