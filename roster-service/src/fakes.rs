//! Substitutable collaborators for service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use roster_cache::MemoryCacheStore;
use roster_core::error::{Result, RosterError};
use roster_core::traits::{AuthorizationClient, CacheStore, UserStore};
use roster_core::types::{RegisterUser, UserFilter, UserRecord, UserStatistics};
use roster_store::MemoryUserStore;

pub fn request(key: &str) -> RegisterUser {
    RegisterUser::new(key, "INV-1")
}

pub fn record(key: &str, name: &str) -> UserRecord {
    UserRecord::from_registration(request(key), name, "seed")
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Memory store that counts calls.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryUserStore,
    pub saves: AtomicUsize,
    pub finds: AtomicUsize,
    pub counts: AtomicUsize,
    pub pages: AtomicUsize,
    pub last_offset: AtomicI64,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn pages(&self) -> usize {
        self.pages.load(Ordering::SeqCst)
    }

    pub fn last_offset(&self) -> i64 {
        self.last_offset.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserStore for CountingStore {
    async fn save(&self, record: UserRecord) -> Result<u64> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(record).await
    }

    async fn find_one(&self, filter: &UserFilter) -> Result<Option<UserRecord>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one(filter).await
    }

    async fn find_by(&self, filter: &UserFilter) -> Result<Vec<UserRecord>> {
        self.inner.find_by(filter).await
    }

    async fn count_by(&self, filter: &UserFilter) -> Result<u64> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        self.inner.count_by(filter).await
    }

    async fn find_page(&self, filter: &UserFilter, offset: i64, limit: u32) -> Result<Vec<UserRecord>> {
        self.pages.fetch_add(1, Ordering::SeqCst);
        self.last_offset.store(offset, Ordering::SeqCst);
        self.inner.find_page(filter, offset, limit).await
    }

    async fn update(&self, record: UserRecord) -> Result<UserRecord> {
        self.inner.update(record).await
    }

    async fn delete(&self, user_key: &str, actor: &str) -> Result<bool> {
        self.inner.delete(user_key, actor).await
    }

    async fn statistics(&self) -> Result<UserStatistics> {
        self.inner.statistics().await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Memory cache that counts calls.
#[derive(Default)]
pub struct CountingCache {
    pub inner: MemoryCacheStore,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
}

impl CountingCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for CountingCache {
    async fn get(&self, key: &str) -> Result<Option<UserRecord>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, record: UserRecord) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, record).await
    }

    async fn evict(&self, key: &str) -> Result<()> {
        self.inner.evict(key).await
    }
}

/// Memory store that can park one `find_one` after it has read the store,
/// so a test can change the store while a lookup holds a stale record.
#[derive(Default)]
pub struct GatedStore {
    pub inner: MemoryUserStore,
    armed: AtomicBool,
    entered: Notify,
    gate: Notify,
}

impl GatedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Parks the next `find_one`.
    pub fn pause_next_find(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Waits until a lookup is parked.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Lets the parked lookup return what it read.
    pub fn open(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl UserStore for GatedStore {
    async fn save(&self, record: UserRecord) -> Result<u64> {
        self.inner.save(record).await
    }

    async fn find_one(&self, filter: &UserFilter) -> Result<Option<UserRecord>> {
        let found = self.inner.find_one(filter).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.gate.notified().await;
        }
        found
    }

    async fn find_by(&self, filter: &UserFilter) -> Result<Vec<UserRecord>> {
        self.inner.find_by(filter).await
    }

    async fn count_by(&self, filter: &UserFilter) -> Result<u64> {
        self.inner.count_by(filter).await
    }

    async fn find_page(&self, filter: &UserFilter, offset: i64, limit: u32) -> Result<Vec<UserRecord>> {
        self.inner.find_page(filter, offset, limit).await
    }

    async fn update(&self, record: UserRecord) -> Result<UserRecord> {
        self.inner.update(record).await
    }

    async fn delete(&self, user_key: &str, actor: &str) -> Result<bool> {
        self.inner.delete(user_key, actor).await
    }

    async fn statistics(&self) -> Result<UserStatistics> {
        self.inner.statistics().await
    }
}

/// Cache whose backend is down.
pub struct BrokenCache;

#[async_trait]
impl CacheStore for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<UserRecord>> {
        Err(RosterError::Store("cache unreachable".into()))
    }

    async fn put(&self, _key: &str, _record: UserRecord) -> Result<()> {
        Err(RosterError::Store("cache unreachable".into()))
    }

    async fn evict(&self, _key: &str) -> Result<()> {
        Err(RosterError::Store("cache unreachable".into()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUTHORIZATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Answers from a fixed table and counts calls.
#[derive(Default)]
pub struct ScriptedAuthorizer {
    names: HashMap<String, String>,
    calls: AtomicUsize,
}

impl ScriptedAuthorizer {
    pub fn with(mut self, key: &str, name: &str) -> Self {
        self.names.insert(key.into(), name.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorizationClient for ScriptedAuthorizer {
    async fn resolve(&self, user_key: &str) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.names.get(user_key).cloned())
    }
}

/// Blocks inside `resolve` until opened, so a test can act while the lock is held.
pub struct GatedAuthorizer {
    name: String,
    entered: Notify,
    gate: Notify,
    calls: AtomicUsize,
}

impl GatedAuthorizer {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            entered: Notify::new(),
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        })
    }

    /// Waits until a caller is parked inside `resolve`.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Lets the parked caller continue.
    pub fn open(&self) {
        self.gate.notify_one();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorizationClient for GatedAuthorizer {
    async fn resolve(&self, _user_key: &str) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(Some(self.name.clone()))
    }
}

/// Authorization service that is down.
pub struct FailingAuthorizer;

#[async_trait]
impl AuthorizationClient for FailingAuthorizer {
    async fn resolve(&self, _user_key: &str) -> Result<Option<String>> {
        Err(RosterError::Http("connection refused".into()))
    }
}

/// Authorization service that never answers in time.
pub struct SlowAuthorizer;

#[async_trait]
impl AuthorizationClient for SlowAuthorizer {
    async fn resolve(&self, _user_key: &str) -> Result<Option<String>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Some("Late".into()))
    }
}

/// Authorization client with a bug.
pub struct PanickingAuthorizer;

#[async_trait]
impl AuthorizationClient for PanickingAuthorizer {
    async fn resolve(&self, _user_key: &str) -> Result<Option<String>> {
        panic!("authorizer bug")
    }
}
