//! Key-based cache in front of the read-heavy catalog views.
//!
//! Reads fall through to the loader on any miss, including when the backend is
//! down. Invalidation is the one operation that reports failure, because a
//! skipped eviction would let a stale snapshot outlive the mutation.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod movies;
pub mod redis;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use movies::{movie_detail_key, movie_keys, ALL_MOVIES_KEY, POPULAR_MOVIES_KEY, UPCOMING_MOVIES_KEY};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Raw string storage with per-entry TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Deleting an absent key is not an error.
    async fn del(&self, keys: &[String]) -> Result<(), CacheError>;
}

#[derive(Clone)]
pub struct CacheService {
    store: Option<Arc<dyn CacheStore>>,
    invalidate_attempts: u32,
}

impl CacheService {
    pub fn new(store: Arc<dyn CacheStore>, invalidate_attempts: u32) -> Self {
        Self {
            store: Some(store),
            invalidate_attempts: invalidate_attempts.max(1),
        }
    }

    /// Every read misses and every write is dropped.
    pub fn disabled() -> Self {
        Self { store: None, invalidate_attempts: 1 }
    }

    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let store = self.store.as_ref()?;
        match store.get(key).await {
            Ok(Some(data)) => match serde_json::from_str(&data) {
                Ok(value) => {
                    debug!("cache hit: {}", key);
                    Some(value)
                }
                Err(e) => {
                    warn!("discarding undecodable cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                debug!("cache miss: {}", key);
                None
            }
            Err(e) => {
                // Кеш недоступен - работаем как при промахе
                warn!("cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    pub async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let data = match serde_json::to_string(value) {
            Ok(data) => data,
            Err(e) => {
                warn!("failed to serialize cache entry {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = store.set_ex(key, &data, ttl).await {
            warn!("cache write failed for {}: {}", key, e);
        }
    }

    /// Evicts `keys` now, retrying transient backend failures.
    pub async fn invalidate(&self, keys: &[String]) -> Result<(), CacheError> {
        let Some(store) = self.store.as_ref() else {
            return Ok(());
        };
        let mut attempt = 1;
        loop {
            match store.del(keys).await {
                Ok(()) => {
                    info!("Invalidated cache keys {:?}", keys);
                    return Ok(());
                }
                Err(e) if attempt < self.invalidate_attempts => {
                    warn!("cache invalidation attempt {} failed: {}", attempt, e);
                    tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Cache-aside read: serve the snapshot under `key`, or run `load` and
    /// store its result for `ttl`.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, ttl: Duration, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.read(key).await {
            return Ok(cached);
        }
        let fresh = load().await?;
        self.write(key, &fresh, ttl).await;
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryCache;
    use super::*;

    fn service(store: &MemoryCache) -> CacheService {
        CacheService::new(Arc::new(store.clone()), 3)
    }

    #[tokio::test]
    async fn read_returns_written_snapshot() {
        let store = MemoryCache::new();
        let cache = service(&store);

        cache.write("k", &vec![1, 2, 3], Duration::from_secs(60)).await;
        let value: Option<Vec<i32>> = cache.read("k").await;
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn expired_entries_miss() {
        let store = MemoryCache::new();
        let cache = service(&store);

        cache.write("k", &1, Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.read::<i32>("k").await, None);
    }

    #[tokio::test]
    async fn invalidating_absent_key_is_ok() {
        let store = MemoryCache::new();
        let cache = service(&store);

        cache.invalidate(&["missing".to_string()]).await.unwrap();
        cache.invalidate(&["missing".to_string()]).await.unwrap();
    }

    #[tokio::test]
    async fn get_or_load_populates_then_hits() {
        let store = MemoryCache::new();
        let cache = service(&store);

        let first: Result<String, ()> = cache
            .get_or_load("greeting", Duration::from_secs(60), || async { Ok("fresh".to_string()) })
            .await;
        assert_eq!(first.unwrap(), "fresh");

        let second: Result<String, ()> = cache
            .get_or_load("greeting", Duration::from_secs(60), || async { Ok("reloaded".to_string()) })
            .await;
        assert_eq!(second.unwrap(), "fresh");
    }

    #[tokio::test]
    async fn unavailable_backend_degrades_to_miss() {
        let store = MemoryCache::new();
        let cache = service(&store);
        cache.write("k", &1, Duration::from_secs(60)).await;

        store.set_unavailable(true);
        assert_eq!(cache.read::<i32>("k").await, None);

        let loaded: Result<i32, ()> = cache
            .get_or_load("k", Duration::from_secs(60), || async { Ok(2) })
            .await;
        assert_eq!(loaded.unwrap(), 2);
    }

    #[tokio::test]
    async fn invalidate_reports_persistent_failure() {
        let store = MemoryCache::new();
        let cache = service(&store);
        store.set_unavailable(true);

        let result = cache.invalidate(&["k".to_string()]).await;
        assert!(matches!(result, Err(CacheError::Unavailable(_))));
    }

    #[tokio::test]
    async fn disabled_cache_always_loads() {
        let cache = CacheService::disabled();
        cache.write("k", &1, Duration::from_secs(60)).await;
        assert_eq!(cache.read::<i32>("k").await, None);
        cache.invalidate(&["k".to_string()]).await.unwrap();
    }
}
