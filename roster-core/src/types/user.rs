//! User record types.
//!
//! A [`UserRecord`] is only ever built from a validated [`RegisterUser`] plus the
//! display name returned by authorization, so a record either exists in full or
//! not at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RosterError};

// ═══════════════════════════════════════════════════════════════════════════════
// DELETE FLAG
// ═══════════════════════════════════════════════════════════════════════════════

/// Soft-delete state of a record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteFlag {
    /// Live record.
    #[default]
    Normal,
    /// Soft-deleted record; its user key may be registered again.
    Deleted,
}

impl DeleteFlag {
    /// Returns the storage code (0 = normal, 1 = deleted).
    pub fn code(self) -> u8 {
        match self {
            DeleteFlag::Normal => 0,
            DeleteFlag::Deleted => 1,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRATION REQUEST
// ═══════════════════════════════════════════════════════════════════════════════

/// Caller-supplied fields of a registration.
///
/// The display name is never taken from here; it always comes from authorization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUser {
    /// Business key of the user, unique among live records.
    pub user_key: String,
    /// Invitation code of the inviting user.
    pub invitor_no: String,
}

impl RegisterUser {
    /// Creates a registration request.
    pub fn new(user_key: impl Into<String>, invitor_no: impl Into<String>) -> Self {
        Self {
            user_key: user_key.into(),
            invitor_no: invitor_no.into(),
        }
    }

    /// Rejects malformed input before it reaches the workflow.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.user_key.trim().is_empty() {
            problems.push("user key is required");
        }
        if self.invitor_no.trim().is_empty() {
            problems.push("invitation code is required");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(RosterError::Validation(problems.join("; ")))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// USER RECORD
// ═══════════════════════════════════════════════════════════════════════════════

/// One registered user.
///
/// `id`, `created_at`, `modified_at` and `version` increments are owned by the
/// store; everything else is set once at registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Store-assigned surrogate id (0 until saved)
    pub id: u64,
    /// Business key, immutable after creation
    pub user_key: String,
    /// Name resolved by authorization at registration time
    pub display_name: String,
    /// Invitation code supplied at registration
    pub invitor_no: String,
    /// Optimistic-concurrency counter
    pub version: u32,
    /// Soft-delete state
    pub deleted: DeleteFlag,
    /// Actor that created the record
    pub created_by: String,
    /// Actor that last modified the record
    pub modified_by: String,
    /// Creation time (store-assigned)
    pub created_at: DateTime<Utc>,
    /// Last modification time (store-assigned)
    pub modified_at: DateTime<Utc>,
}

impl UserRecord {
    /// Builds a fresh record from a registration and the authorized display name.
    ///
    /// The record starts at version 0, not deleted, stamped with `actor`.
    pub fn from_registration(
        request: RegisterUser,
        display_name: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        let actor = actor.into();
        let now = Utc::now();
        Self {
            id: 0,
            user_key: request.user_key,
            display_name: display_name.into(),
            invitor_no: request.invitor_no,
            version: 0,
            deleted: DeleteFlag::Normal,
            created_by: actor.clone(),
            modified_by: actor,
            created_at: now,
            modified_at: now,
        }
    }

    /// Returns true if the record is live.
    pub fn is_active(&self) -> bool {
        self.deleted == DeleteFlag::Normal
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FILTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Query-by-example filter. Unset fields match anything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFilter {
    /// Exact user key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_key: Option<String>,
    /// Exact display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Exact invitation code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invitor_no: Option<String>,
    /// Exact creator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Delete state; `None` matches both
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<DeleteFlag>,
}

impl UserFilter {
    /// Filter matching every live record.
    pub fn active() -> Self {
        Self {
            deleted: Some(DeleteFlag::Normal),
            ..Default::default()
        }
    }

    /// Filter matching the live record with the given key.
    pub fn by_key(user_key: impl Into<String>) -> Self {
        Self {
            user_key: Some(user_key.into()),
            ..Self::active()
        }
    }

    /// Returns true if the record satisfies every set field.
    pub fn matches(&self, record: &UserRecord) -> bool {
        fn field(expected: &Option<String>, actual: &str) -> bool {
            expected.as_deref().map_or(true, |e| e == actual)
        }

        field(&self.user_key, &record.user_key)
            && field(&self.display_name, &record.display_name)
            && field(&self.invitor_no, &record.invitor_no)
            && field(&self.created_by, &record.created_by)
            && self.deleted.map_or(true, |d| d == record.deleted)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATISTICS
// ═══════════════════════════════════════════════════════════════════════════════

/// Aggregate counts over the store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatistics {
    /// All records, live or deleted
    pub total: u64,
    /// Live records
    pub active: u64,
    /// Soft-deleted records
    pub deleted: u64,
}

impl UserStatistics {
    /// Creates empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one record.
    pub fn add(&mut self, record: &UserRecord) {
        self.total += 1;
        match record.deleted {
            DeleteFlag::Normal => self.active += 1,
            DeleteFlag::Deleted => self.deleted += 1,
        }
    }
}
