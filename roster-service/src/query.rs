//! Cache-aside lookup by user key.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use roster_core::error::Result;
use roster_core::traits::{CacheStore, UserStore};
use roster_core::types::{UserFilter, UserRecord};

/// Read-through lookup of live records.
///
/// Hits are served from the cache. Misses go to the store, and a found record
/// is cached before it is returned. Absent keys are never cached, so every
/// lookup of a missing key reaches the store.
///
/// The cache is best-effort: if it fails, the lookup falls back to the store.
///
/// A lookup that read the store before an [`QueryCache::evict`] may finish
/// after it. Every eviction bumps a counter, and a lookup that sees the
/// counter move while it was filling the cache drops its copy again.
pub struct QueryCache {
    cache: Option<Arc<dyn CacheStore>>,
    store: Arc<dyn UserStore>,
    evictions: AtomicU64,
}

impl QueryCache {
    /// Creates a read-through lookup over `cache` and `store`.
    pub fn new(cache: Arc<dyn CacheStore>, store: Arc<dyn UserStore>) -> Self {
        Self {
            cache: Some(cache),
            store,
            evictions: AtomicU64::new(0),
        }
    }

    /// Creates a lookup that always reads the store.
    pub fn uncached(store: Arc<dyn UserStore>) -> Self {
        Self {
            cache: None,
            store,
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns true if lookups go through a cache.
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Looks up the live record for `user_key`.
    #[instrument(skip(self))]
    pub async fn get(&self, user_key: &str) -> Result<Option<UserRecord>> {
        let Some(cache) = &self.cache else {
            return self.load(user_key).await;
        };

        match cache.get(user_key).await {
            Ok(Some(record)) => {
                debug!("Cache hit");
                return Ok(Some(record));
            }
            Ok(None) => debug!("Cache miss"),
            Err(e) => warn!(error = %e, "Cache read failed, reading store"),
        }

        let seen = self.evictions.load(Ordering::SeqCst);
        let found = self.load(user_key).await?;
        if let Some(record) = &found {
            if let Err(e) = cache.put(user_key, record.clone()).await {
                warn!(error = %e, "Cache write failed");
            } else if self.evictions.load(Ordering::SeqCst) != seen {
                debug!("Evicted during lookup, dropping cached copy");
                if let Err(e) = cache.evict(user_key).await {
                    warn!(error = %e, "Cache eviction failed");
                }
            }
        }
        Ok(found)
    }

    /// Drops the cached entry for `user_key`.
    ///
    /// Call after the store change it reflects; lookups still in flight will
    /// not re-cache what they read before it.
    pub async fn evict(&self, user_key: &str) -> Result<()> {
        self.evictions.fetch_add(1, Ordering::SeqCst);
        match &self.cache {
            Some(cache) => cache.evict(user_key).await,
            None => Ok(()),
        }
    }

    async fn load(&self, user_key: &str) -> Result<Option<UserRecord>> {
        self.store.find_one(&UserFilter::by_key(user_key)).await
    }
}
