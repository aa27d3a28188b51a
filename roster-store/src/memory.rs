//! In-memory user store.
//!
//! Fast, thread-safe storage suitable for development, testing,
//! and single-process deployments.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, instrument};

use roster_core::error::{Result, RosterError};
use roster_core::traits::UserStore;
use roster_core::types::{DeleteFlag, UserFilter, UserRecord, UserStatistics};

/// In-memory user store.
///
/// # Indexing
///
/// Records are indexed by:
/// - ID: Primary storage
/// - User key: Live records only, enforces uniqueness
///
/// Store order (used by listing and paging) is ascending id.
#[derive(Debug)]
pub struct MemoryUserStore {
    /// Primary storage: ID → record
    records: DashMap<u64, UserRecord>,
    /// Unique index: user key → ID of the live record
    key_index: DashMap<String, u64>,
    /// Next record ID
    next_id: AtomicU64,
}

impl MemoryUserStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            key_index: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Creates a store with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: DashMap::with_capacity(capacity),
            key_index: DashMap::with_capacity(capacity),
            next_id: AtomicU64::new(1),
        }
    }

    /// Clears all records.
    pub fn clear(&self) {
        self.records.clear();
        self.key_index.clear();
        self.next_id.store(1, Ordering::SeqCst);
    }

    /// Returns the number of records, deleted ones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns every record in store order (for export/backup).
    pub fn all_records(&self) -> Vec<UserRecord> {
        let mut records: Vec<UserRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|r| r.id);
        records
    }

    /// Imports records as they are, keeping their ids and timestamps.
    ///
    /// Used when restoring from a snapshot.
    pub fn import(&self, records: Vec<UserRecord>) -> Result<usize> {
        let mut imported = 0;

        for record in records {
            if record.id == 0 {
                return Err(RosterError::Store(format!(
                    "imported record '{}' has no id",
                    record.user_key
                )));
            }

            let current = self.next_id.load(Ordering::SeqCst);
            if record.id >= current {
                self.next_id.store(record.id + 1, Ordering::SeqCst);
            }

            if record.is_active() {
                match self.key_index.entry(record.user_key.clone()) {
                    Entry::Occupied(_) => {
                        return Err(RosterError::DuplicateKey(record.user_key));
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(record.id);
                    }
                }
            }

            self.records.insert(record.id, record);
            imported += 1;
        }

        Ok(imported)
    }

    /// Returns the record stored under `id`, deleted or not.
    pub fn record(&self, id: u64) -> Option<UserRecord> {
        self.records.get(&id).map(|r| r.value().clone())
    }

    /// Returns the live record for `user_key`.
    pub fn live_record(&self, user_key: &str) -> Option<UserRecord> {
        let id = *self.key_index.get(user_key)?;
        self.record(id)
    }

    /// Removes the record stored under `id` along with its key index entry.
    ///
    /// The index entry is only dropped while it still points at `id`.
    pub fn discard(&self, id: u64) -> Option<UserRecord> {
        let (_, record) = self.records.remove(&id)?;
        self.key_index.remove_if(&record.user_key, |_, indexed| *indexed == id);
        debug!(id, "Discarded user");
        Some(record)
    }

    /// Puts a previously read record back as it was, re-indexing live keys.
    pub fn restore(&self, record: UserRecord) {
        let id = record.id;
        let index_key = record.is_active().then(|| record.user_key.clone());
        self.records.insert(id, record);
        if let Some(key) = index_key {
            self.key_index.insert(key, id);
        }
        debug!(id, "Restored user");
    }

    fn matching(&self, filter: &UserFilter) -> Vec<UserRecord> {
        let mut records: Vec<UserRecord> = self
            .records
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|r| r.id);
        records
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    /// Inserts a record, assigning its id and timestamps.
    #[instrument(skip(self, record), fields(user_key = %record.user_key))]
    async fn save(&self, mut record: UserRecord) -> Result<u64> {
        if record.user_key.trim().is_empty() {
            return Err(RosterError::Validation("user key cannot be empty".into()));
        }

        let now = Utc::now();
        record.created_at = now;
        record.modified_at = now;

        if !record.is_active() {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            record.id = id;
            self.records.insert(id, record);
            return Ok(id);
        }

        // Holding the index entry makes check-and-insert atomic per key.
        match self.key_index.entry(record.user_key.clone()) {
            Entry::Occupied(_) => {
                debug!("Duplicate user key");
                Err(RosterError::DuplicateKey(record.user_key))
            }
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                record.id = id;
                self.records.insert(id, record);
                slot.insert(id);

                debug!(id, "Saved user");
                Ok(id)
            }
        }
    }

    #[instrument(skip(self))]
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<UserRecord>> {
        // Fast path through the unique index.
        if let (Some(key), Some(DeleteFlag::Normal)) = (&filter.user_key, filter.deleted) {
            let found = self
                .key_index
                .get(key)
                .and_then(|id| self.records.get(id.value()).map(|r| r.value().clone()))
                .filter(|record| filter.matches(record));
            return Ok(found);
        }

        Ok(self.matching(filter).into_iter().next())
    }

    #[instrument(skip(self))]
    async fn find_by(&self, filter: &UserFilter) -> Result<Vec<UserRecord>> {
        let records = self.matching(filter);
        debug!(count = records.len(), "Found users");
        Ok(records)
    }

    async fn count_by(&self, filter: &UserFilter) -> Result<u64> {
        let count = self
            .records
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .count();
        Ok(count as u64)
    }

    #[instrument(skip(self))]
    async fn find_page(&self, filter: &UserFilter, offset: i64, limit: u32) -> Result<Vec<UserRecord>> {
        let offset = usize::try_from(offset).map_err(|_| {
            RosterError::Validation(format!("offset must be non-negative, got {}", offset))
        })?;

        let page: Vec<UserRecord> = self
            .matching(filter)
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect();

        debug!(offset, limit, count = page.len(), "Fetched page");
        Ok(page)
    }

    #[instrument(skip(self, record), fields(user_key = %record.user_key, version = record.version))]
    async fn update(&self, record: UserRecord) -> Result<UserRecord> {
        let mut stored = self
            .records
            .get_mut(&record.id)
            .ok_or_else(|| RosterError::NotFound(record.user_key.clone()))?;

        if stored.user_key != record.user_key {
            return Err(RosterError::Validation("user key is immutable".into()));
        }
        if stored.deleted != record.deleted {
            return Err(RosterError::Validation(
                "delete state changes go through delete".into(),
            ));
        }
        if stored.version != record.version {
            return Err(RosterError::VersionConflict {
                user_key: record.user_key,
                expected: record.version,
                actual: stored.version,
            });
        }

        stored.display_name = record.display_name;
        stored.invitor_no = record.invitor_no;
        stored.modified_by = record.modified_by;
        stored.modified_at = Utc::now();
        stored.version += 1;

        debug!(version = stored.version, "Updated user");
        Ok(stored.value().clone())
    }

    #[instrument(skip(self))]
    async fn delete(&self, user_key: &str, actor: &str) -> Result<bool> {
        let Some((_, id)) = self.key_index.remove(user_key) else {
            return Ok(false);
        };

        if let Some(mut record) = self.records.get_mut(&id) {
            record.deleted = DeleteFlag::Deleted;
            record.modified_by = actor.to_string();
            record.modified_at = Utc::now();
            record.version += 1;
        }

        debug!(id, "Soft-deleted user");
        Ok(true)
    }

    async fn statistics(&self) -> Result<UserStatistics> {
        let mut stats = UserStatistics::new();
        for entry in self.records.iter() {
            stats.add(entry.value());
        }
        Ok(stats)
    }
}
