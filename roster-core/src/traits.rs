//! Collaborator traits for Roster.
//!
//! The registration workflow and query cache depend only on these interfaces,
//! never on a concrete coordination store, directory service, or database.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{LockHandle, UserFilter, UserRecord, UserStatistics};

// ═══════════════════════════════════════════════════════════════════════════════
// LOCK SERVICE
// ═══════════════════════════════════════════════════════════════════════════════

/// Named, leased mutual exclusion backed by a store shared by every worker.
#[async_trait]
pub trait LockService: Send + Sync {
    /// Tries to take the lock for `key` without waiting.
    ///
    /// Returns `Ok(None)` when the key is already held, including by a crashed
    /// holder whose lease has not yet run out. `Err` means the coordination
    /// store itself could not be reached.
    async fn acquire(&self, key: &str) -> Result<Option<LockHandle>>;

    /// Releases a held lock.
    ///
    /// Idempotent and infallible: releasing twice, or after the lease lapsed,
    /// is a no-op. Implementations log failures instead of returning them.
    async fn release(&self, handle: &LockHandle);
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUTHORIZATION CLIENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolves a user key to a verified display name.
#[async_trait]
pub trait AuthorizationClient: Send + Sync {
    /// Returns the display name, or `None` when the key is not authorized.
    ///
    /// A blank name is equivalent to `None`. Transport failures are errors.
    async fn resolve(&self, user_key: &str) -> Result<Option<String>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// USER STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Durable storage of user records.
///
/// Implementations might use:
/// - In-memory storage (for testing/development)
/// - A snapshot file (single node)
/// - A relational database (production)
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new record and returns its assigned id.
    ///
    /// Fails with `DuplicateKey` when a live record already has this user key.
    async fn save(&self, record: UserRecord) -> Result<u64>;

    /// Inserts several records, stopping at the first failure.
    ///
    /// Returns the number of records inserted.
    async fn save_all(&self, records: Vec<UserRecord>) -> Result<usize> {
        let mut saved = 0;
        for record in records {
            self.save(record).await?;
            saved += 1;
        }
        Ok(saved)
    }

    /// Returns the first record matching `filter`, if any.
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<UserRecord>>;

    /// Returns every record matching `filter`, in store order.
    async fn find_by(&self, filter: &UserFilter) -> Result<Vec<UserRecord>>;

    /// Counts records matching `filter`.
    async fn count_by(&self, filter: &UserFilter) -> Result<u64>;

    /// Returns up to `limit` matching records starting at `offset`, in store order.
    async fn find_page(&self, filter: &UserFilter, offset: i64, limit: u32) -> Result<Vec<UserRecord>>;

    /// Replaces a record if its version still matches, returning the stored copy.
    ///
    /// The stored version is incremented. Fails with `VersionConflict` on a stale
    /// version and `NotFound` when no such record exists.
    async fn update(&self, record: UserRecord) -> Result<UserRecord>;

    /// Soft-deletes the live record for `user_key`. Returns false if there was none.
    async fn delete(&self, user_key: &str, actor: &str) -> Result<bool>;

    /// Aggregate counts.
    async fn statistics(&self) -> Result<UserStatistics>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Opaque key → record cache shared by every worker.
///
/// Get and put are atomic per key. Eviction policy belongs to the implementation.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the cached record for `key`.
    async fn get(&self, key: &str) -> Result<Option<UserRecord>>;

    /// Caches `record` under `key`.
    async fn put(&self, key: &str, record: UserRecord) -> Result<()>;

    /// Drops the entry for `key`, if present.
    async fn evict(&self, key: &str) -> Result<()>;
}
