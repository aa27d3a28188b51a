//! File-backed user store with persistence.
//!
//! Keeps records in a [`MemoryUserStore`] and writes a full snapshot after
//! mutations. Suitable for single-node deployments where durability is needed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use roster_core::error::{Result, RosterError};
use roster_core::traits::UserStore;
use roster_core::types::{UserFilter, UserRecord, UserStatistics};

use crate::MemoryUserStore;

/// File format magic bytes
const MAGIC: &[u8; 4] = b"RSTR";
/// Current file format version
const VERSION: u8 = 1;
/// magic + version + count
const HEADER_LEN: usize = 13;

/// File-backed user store.
///
/// # File Format
///
/// ```text
/// magic (4 bytes): "RSTR"
/// version (1 byte): 1
/// count (8 bytes, little endian): number of records
/// records (variable): JSON array of records
/// ```
///
/// Snapshots are written to a temp file and renamed into place.
pub struct FileUserStore {
    /// Path to the storage file
    path: PathBuf,
    /// In-memory storage
    memory: MemoryUserStore,
    /// Whether there are unsaved changes
    dirty: AtomicBool,
    /// Save after this many writes (1 = every write)
    auto_save_threshold: u64,
    /// Writes since last save
    writes_since_save: AtomicU64,
    /// Serializes snapshot writes
    save_lock: Mutex<()>,
}

impl FileUserStore {
    /// Opens the store at `path`, loading it if the file exists.
    ///
    /// Every write is persisted before it is acknowledged.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            memory: MemoryUserStore::new(),
            dirty: AtomicBool::new(false),
            auto_save_threshold: 1,
            writes_since_save: AtomicU64::new(0),
            save_lock: Mutex::new(()),
        };

        if fs::try_exists(&store.path).await? {
            store.load().await?;
        }

        Ok(store)
    }

    /// Opens the store with a custom auto-save threshold.
    ///
    /// A threshold above 1 batches writes; unsaved writes are lost on crash
    /// unless [`FileUserStore::flush`] is called.
    pub async fn with_auto_save(path: impl AsRef<Path>, threshold: u64) -> Result<Self> {
        let mut store = Self::new(path).await?;
        store.auto_save_threshold = threshold.max(1);
        Ok(store)
    }

    #[instrument(skip(self), fields(path = ?self.path))]
    async fn load(&self) -> Result<()> {
        let mut file = fs::File::open(&self.path).await?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await?;

        if contents.len() < HEADER_LEN {
            return Err(RosterError::Store("store file too short".into()));
        }
        if &contents[0..4] != MAGIC {
            return Err(RosterError::Store("invalid magic bytes".into()));
        }
        let version = contents[4];
        if version != VERSION {
            return Err(RosterError::Store(format!(
                "unsupported store file version: expected {}, got {}",
                VERSION, version
            )));
        }

        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&contents[5..HEADER_LEN]);
        let count = u64::from_le_bytes(count_bytes);

        let records: Vec<UserRecord> = if contents.len() > HEADER_LEN {
            serde_json::from_slice(&contents[HEADER_LEN..])?
        } else {
            Vec::new()
        };

        if records.len() as u64 != count {
            return Err(RosterError::Store(format!(
                "record count mismatch: header says {}, found {}",
                count,
                records.len()
            )));
        }

        let imported = self.memory.import(records)?;
        self.dirty.store(false, Ordering::SeqCst);

        info!(imported, "Loaded users from file");
        Ok(())
    }

    /// Writes a snapshot of every record to the file.
    #[instrument(skip(self), fields(path = ?self.path))]
    pub async fn save_snapshot(&self) -> Result<()> {
        let _saving = self.save_lock.lock().await;

        let records = self.memory.all_records();
        let count = records.len() as u64;
        let serialized = serde_json::to_vec(&records)?;

        let mut contents = Vec::with_capacity(HEADER_LEN + serialized.len());
        contents.extend_from_slice(MAGIC);
        contents.push(VERSION);
        contents.extend_from_slice(&count.to_le_bytes());
        contents.extend_from_slice(&serialized);

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&contents).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &self.path).await?;

        self.dirty.store(false, Ordering::SeqCst);
        self.writes_since_save.store(0, Ordering::SeqCst);

        debug!(count, "Snapshot written");
        Ok(())
    }

    /// Checks if there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Forces a save if dirty.
    pub async fn flush(&self) -> Result<()> {
        if self.is_dirty() {
            self.save_snapshot().await?;
        }
        Ok(())
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the underlying memory store for direct access.
    pub fn memory(&self) -> &MemoryUserStore {
        &self.memory
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    async fn record_write(&self) -> Result<()> {
        self.dirty.store(true, Ordering::SeqCst);
        let writes = self.writes_since_save.fetch_add(1, Ordering::SeqCst) + 1;
        if writes >= self.auto_save_threshold {
            self.save_snapshot().await.map_err(|e| match e {
                RosterError::Io(io) => RosterError::Store(format!("snapshot write failed: {}", io)),
                other => other,
            })?;
        }
        Ok(())
    }

    fn roll_back(&self, previous: Option<UserRecord>) {
        if let Some(record) = previous {
            self.memory.restore(record);
        }
    }
}

impl Drop for FileUserStore {
    fn drop(&mut self) {
        if self.is_dirty() {
            warn!(path = ?self.path, "FileUserStore dropped with unsaved changes");
        }
    }
}

#[async_trait]
impl UserStore for FileUserStore {
    async fn save(&self, record: UserRecord) -> Result<u64> {
        let id = self.memory.save(record).await?;
        if let Err(e) = self.record_write().await {
            self.memory.discard(id);
            warn!(id, error = %e, "Snapshot failed, save rolled back");
            return Err(e);
        }
        Ok(id)
    }

    async fn find_one(&self, filter: &UserFilter) -> Result<Option<UserRecord>> {
        self.memory.find_one(filter).await
    }

    async fn find_by(&self, filter: &UserFilter) -> Result<Vec<UserRecord>> {
        self.memory.find_by(filter).await
    }

    async fn count_by(&self, filter: &UserFilter) -> Result<u64> {
        self.memory.count_by(filter).await
    }

    async fn find_page(&self, filter: &UserFilter, offset: i64, limit: u32) -> Result<Vec<UserRecord>> {
        self.memory.find_page(filter, offset, limit).await
    }

    async fn update(&self, record: UserRecord) -> Result<UserRecord> {
        let previous = self.memory.record(record.id);
        let updated = self.memory.update(record).await?;
        if let Err(e) = self.record_write().await {
            self.roll_back(previous);
            warn!(id = updated.id, error = %e, "Snapshot failed, update rolled back");
            return Err(e);
        }
        Ok(updated)
    }

    async fn delete(&self, user_key: &str, actor: &str) -> Result<bool> {
        let previous = self.memory.live_record(user_key);
        if !self.memory.delete(user_key, actor).await? {
            return Ok(false);
        }
        if let Err(e) = self.record_write().await {
            self.roll_back(previous);
            warn!(user_key, error = %e, "Snapshot failed, delete rolled back");
            return Err(e);
        }
        Ok(true)
    }

    async fn statistics(&self) -> Result<UserStatistics> {
        self.memory.statistics().await
    }
}
