//! In-memory lock service.
//!
//! A concurrent map stands in for the coordination store: each entry is a lease
//! with an owner token and a deadline. Every worker sharing the same
//! `MemoryLockService` (usually behind an `Arc`) sees the same locks.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use roster_core::constants::{LOCK_LEASE_SECONDS, LOCK_REGISTRY_PREFIX};
use roster_core::error::{Result, RosterError};
use roster_core::traits::LockService;
use roster_core::types::LockHandle;

/// Lock service configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LockConfig {
    /// Namespace prepended to every key
    pub prefix: String,
    /// Lease length in seconds
    pub lease_seconds: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            prefix: LOCK_REGISTRY_PREFIX.into(),
            lease_seconds: LOCK_LEASE_SECONDS,
        }
    }
}

impl LockConfig {
    /// Lease length.
    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_seconds)
    }

    /// Checks that a lease is usable and outlasts `max_hold`, the longest any
    /// holder keeps the lock.
    pub fn validate(&self, max_hold: Duration) -> Result<()> {
        let lease = self.lease();
        if lease.is_zero() {
            return Err(RosterError::Config("lock lease must be at least one second".into()));
        }
        if Instant::now().checked_add(lease).is_none() {
            return Err(RosterError::Config(format!(
                "lock lease of {}s is out of range",
                self.lease_seconds
            )));
        }
        if lease <= max_hold {
            return Err(RosterError::Config(format!(
                "lock lease of {}s must be longer than the {}ms a holder may keep it",
                self.lease_seconds,
                max_hold.as_millis()
            )));
        }
        Ok(())
    }
}

/// A live lease in the table.
#[derive(Clone, Debug)]
struct Lease {
    token: Uuid,
    expires_at: Instant,
}

impl Lease {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory, leased lock registry.
#[derive(Debug)]
pub struct MemoryLockService {
    /// Namespaced key → current lease
    leases: DashMap<String, Lease>,
    prefix: String,
    lease: Duration,
}

impl MemoryLockService {
    /// Creates a lock service with the default 60 second lease.
    pub fn new() -> Self {
        Self::with_config(LockConfig::default())
    }

    /// Creates a lock service from configuration.
    pub fn with_config(config: LockConfig) -> Self {
        Self {
            leases: DashMap::new(),
            lease: config.lease(),
            prefix: config.prefix,
        }
    }

    /// Overrides the lease length.
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Lease granted to every acquisition.
    pub fn lease(&self) -> Duration {
        self.lease
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    /// Returns true if `key` is currently held by anyone.
    pub fn is_held(&self, key: &str) -> bool {
        self.leases
            .get(&self.namespaced(key))
            .map_or(false, |lease| !lease.is_expired())
    }

    /// Number of entries in the lease table, expired ones included.
    pub fn len(&self) -> usize {
        self.leases.len()
    }

    /// Returns true if the lease table is empty.
    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }

    /// Drops every lapsed lease from the table.
    pub fn purge_expired(&self) -> usize {
        let before = self.leases.len();
        self.leases.retain(|_, lease| !lease.is_expired());
        before.saturating_sub(self.leases.len())
    }
}

impl Default for MemoryLockService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LockService for MemoryLockService {
    #[instrument(skip(self))]
    async fn acquire(&self, key: &str) -> Result<Option<LockHandle>> {
        let expires_at = Instant::now().checked_add(self.lease).ok_or_else(|| {
            RosterError::Config(format!("lock lease of {:?} is out of range", self.lease))
        })?;
        let handle = LockHandle::new(key, self.lease);
        let lease = Lease {
            token: handle.token(),
            expires_at,
        };

        // The entry holds the shard lock, so check-and-set is atomic per key.
        match self.leases.entry(self.namespaced(key)) {
            Entry::Occupied(mut current) => {
                if !current.get().is_expired() {
                    debug!(key, "Lock busy");
                    return Ok(None);
                }
                debug!(key, "Taking over lapsed lease");
                current.insert(lease);
            }
            Entry::Vacant(slot) => {
                slot.insert(lease);
            }
        }

        debug!(key, token = %handle.token(), "Lock acquired");
        Ok(Some(handle))
    }

    #[instrument(skip(self, handle), fields(key = handle.key()))]
    async fn release(&self, handle: &LockHandle) {
        let token = handle.token();
        let removed = self
            .leases
            .remove_if(&self.namespaced(handle.key()), |_, lease| lease.token == token);

        if removed.is_some() {
            debug!("Lock released");
        } else {
            debug!("Lock already released or taken over");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::task::JoinSet;

    fn config(lease_seconds: u64) -> LockConfig {
        LockConfig {
            lease_seconds,
            ..LockConfig::default()
        }
    }

    #[test]
    fn test_default_lease_is_valid() {
        assert!(LockConfig::default().validate(Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn test_zero_lease_rejected() {
        let err = config(0).validate(Duration::ZERO).unwrap_err();
        assert!(matches!(err, RosterError::Config(_)));
    }

    #[test]
    fn test_lease_must_outlast_holder() {
        let max_hold = Duration::from_secs(10);
        assert!(matches!(config(10).validate(max_hold), Err(RosterError::Config(_))));
        assert!(matches!(config(5).validate(max_hold), Err(RosterError::Config(_))));
        assert!(config(11).validate(max_hold).is_ok());
    }

    #[test]
    fn test_out_of_range_lease_rejected() {
        let err = config(u64::MAX).validate(Duration::ZERO).unwrap_err();
        assert!(matches!(err, RosterError::Config(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_lease_fails_acquire() {
        let locks = MemoryLockService::new().with_lease(Duration::MAX);

        let err = locks.acquire("U1").await.unwrap_err();

        assert!(matches!(err, RosterError::Config(_)));
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_acquire_then_busy() {
        let locks = MemoryLockService::new();

        let handle = locks.acquire("U1").await.unwrap();
        assert!(handle.is_some());
        assert!(locks.acquire("U1").await.unwrap().is_none());
        assert!(locks.is_held("U1"));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let locks = MemoryLockService::new();

        assert!(locks.acquire("U1").await.unwrap().is_some());
        assert!(locks.acquire("U2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_release_allows_reacquire() {
        let locks = MemoryLockService::new();

        let handle = locks.acquire("U1").await.unwrap().unwrap();
        locks.release(&handle).await;

        assert!(!locks.is_held("U1"));
        assert!(locks.acquire("U1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let locks = MemoryLockService::new();

        let handle = locks.acquire("U1").await.unwrap().unwrap();
        locks.release(&handle).await;
        locks.release(&handle).await;

        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_expired_lease_can_be_taken_over() {
        let locks = MemoryLockService::new().with_lease(Duration::from_millis(20));

        let _crashed = locks.acquire("U1").await.unwrap().unwrap();
        assert!(locks.acquire("U1").await.unwrap().is_none());

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(locks.acquire("U1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stale_release_keeps_new_holder() {
        let locks = MemoryLockService::new().with_lease(Duration::from_millis(20));

        let stale = locks.acquire("U1").await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        let _fresh = locks.acquire("U1").await.unwrap().unwrap();

        locks.release(&stale).await;

        assert!(locks.is_held("U1"));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let locks = MemoryLockService::new().with_lease(Duration::from_millis(10));
        locks.acquire("U1").await.unwrap();
        locks.acquire("U2").await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(locks.purge_expired(), 2);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_prefix_namespaces_keys() {
        let locks = MemoryLockService::with_config(LockConfig {
            prefix: "tenant-a".into(),
            lease_seconds: 60,
        });
        locks.acquire("U1").await.unwrap();

        assert!(locks.leases.contains_key("tenant-a:U1"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_has_one_winner() {
        let locks = Arc::new(MemoryLockService::new());
        let mut tasks = JoinSet::new();

        for _ in 0..64 {
            let locks = locks.clone();
            tasks.spawn(async move { locks.acquire("U1").await.unwrap().is_some() });
        }

        let mut winners = 0;
        while let Some(result) = tasks.join_next().await {
            if result.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
    }
}
