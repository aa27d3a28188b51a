//! Bounded in-memory record cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use roster_core::constants::{CACHE_MAX_ENTRIES, CACHE_TTL_SECONDS};
use roster_core::error::Result;
use roster_core::traits::CacheStore;
use roster_core::types::UserRecord;

/// A cached record and when it stops being served.
struct Slot {
    record: UserRecord,
    expires_at: Instant,
    /// Insertion order, for evicting the oldest slot
    seq: u64,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of slots; 0 disables caching
    pub capacity: usize,
    /// Time a record is served after it was cached, in seconds
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: CACHE_MAX_ENTRIES,
            ttl_seconds: CACHE_TTL_SECONDS,
        }
    }
}

/// Cache counters, as reported by the stats endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Slots currently held, expired ones included
    pub entries: usize,
    /// Slots still being served
    pub live_entries: usize,
    /// Maximum number of slots
    pub capacity: usize,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found nothing live
    pub misses: u64,
    /// Live slots pushed out to make room
    pub evictions: u64,
}

/// In-memory user record cache keyed by user key.
///
/// Keys are matched exactly. When full, expired slots are dropped first and
/// then the oldest live slot is evicted.
pub struct MemoryCacheStore {
    slots: RwLock<HashMap<String, Slot>>,
    capacity: usize,
    ttl: Duration,
    next_seq: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryCacheStore {
    /// Creates a cache with the default capacity and TTL.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache from configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            capacity: config.capacity,
            ttl: Duration::from_secs(config.ttl_seconds),
            next_seq: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns the live record cached under `key`.
    pub fn lookup(&self, key: &str) -> Option<UserRecord> {
        let now = Instant::now();
        let found = self
            .slots
            .read()
            .get(key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.record.clone());

        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Caches `record` under `key` for the configured TTL.
    pub fn insert(&self, key: &str, record: UserRecord) {
        self.insert_for(key, record, self.ttl);
    }

    /// Caches `record` under `key` for `ttl`.
    pub fn insert_for(&self, key: &str, record: UserRecord, ttl: Duration) {
        if self.capacity == 0 {
            return;
        }
        let now = Instant::now();
        let mut slots = self.slots.write();

        if !slots.contains_key(key) && slots.len() >= self.capacity {
            slots.retain(|_, slot| slot.is_live(now));
            if slots.len() >= self.capacity {
                let oldest = slots
                    .iter()
                    .min_by_key(|(_, slot)| slot.seq)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    slots.remove(&oldest);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        slots.insert(
            key.to_string(),
            Slot {
                record,
                expires_at: now + ttl,
                seq,
            },
        );
    }

    /// Drops the slot for `key`.
    pub fn invalidate(&self, key: &str) {
        self.slots.write().remove(key);
    }

    /// Drops every slot.
    pub fn invalidate_all(&self) {
        self.slots.write().clear();
    }

    /// Drops expired slots and returns how many went.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|_, slot| slot.is_live(now));
        before - slots.len()
    }

    /// Number of slots, expired ones included.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let slots = self.slots.read();
        CacheStats {
            entries: slots.len(),
            live_entries: slots.values().filter(|slot| slot.is_live(now)).count(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<UserRecord>> {
        Ok(self.lookup(key))
    }

    async fn put(&self, key: &str, record: UserRecord) -> Result<()> {
        self.insert(key, record);
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<()> {
        self.invalidate(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::types::RegisterUser;

    fn user(key: &str) -> UserRecord {
        UserRecord::from_registration(RegisterUser::new(key, "INV-1"), "Alice", key)
    }

    fn small(capacity: usize) -> MemoryCacheStore {
        MemoryCacheStore::with_config(CacheConfig {
            capacity,
            ..CacheConfig::default()
        })
    }

    #[test]
    fn test_insert_and_lookup() {
        let cache = MemoryCacheStore::new();
        cache.insert("U1", user("U1"));

        assert_eq!(cache.lookup("U1").unwrap().display_name, "Alice");
        assert!(cache.lookup("U2").is_none());

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn test_keys_are_exact() {
        let cache = MemoryCacheStore::new();
        cache.insert("U1", user("U1"));

        assert!(cache.lookup("u1").is_none());
        assert!(cache.lookup(" U1").is_none());
    }

    #[test]
    fn test_invalidate() {
        let cache = MemoryCacheStore::new();
        cache.insert("U1", user("U1"));
        cache.insert("U2", user("U2"));

        cache.invalidate("U1");
        assert!(cache.lookup("U1").is_none());
        assert!(cache.lookup("U2").is_some());

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_slot_is_not_served() {
        let cache = MemoryCacheStore::new();
        cache.insert_for("U1", user("U1"), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));

        assert!(cache.lookup("U1").is_none());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().live_entries, 0);
    }

    #[test]
    fn test_full_cache_evicts_oldest() {
        let cache = small(2);
        cache.insert("U1", user("U1"));
        cache.insert("U2", user("U2"));
        cache.insert("U3", user("U3"));

        assert_eq!(cache.len(), 2);
        assert!(cache.lookup("U1").is_none());
        assert!(cache.lookup("U2").is_some());
        assert!(cache.lookup("U3").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_full_cache_drops_expired_before_live() {
        let cache = small(2);
        cache.insert("U1", user("U1"));
        cache.insert_for("U2", user("U2"), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));

        cache.insert("U3", user("U3"));

        assert!(cache.lookup("U1").is_some());
        assert!(cache.lookup("U3").is_some());
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_refreshing_a_key_at_capacity_keeps_others() {
        let cache = small(2);
        cache.insert("U1", user("U1"));
        cache.insert("U2", user("U2"));
        cache.insert("U1", user("U1"));

        assert!(cache.lookup("U1").is_some());
        assert!(cache.lookup("U2").is_some());
    }

    #[test]
    fn test_zero_capacity_caches_nothing() {
        let cache = small(0);
        cache.insert("U1", user("U1"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let cache = MemoryCacheStore::new();
        cache.insert_for("U1", user("U1"), Duration::from_millis(1));
        cache.insert("U2", user("U2"));
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_cache_store_trait() {
        let cache = MemoryCacheStore::new();
        let store: &dyn CacheStore = &cache;

        assert!(store.get("U1").await.unwrap().is_none());
        store.put("U1", user("U1")).await.unwrap();
        assert!(store.get("U1").await.unwrap().is_some());
        store.evict("U1").await.unwrap();
        assert!(store.get("U1").await.unwrap().is_none());
    }
}
