//! Lock handle type.

use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Exclusively held, leased lock on one key.
///
/// The token identifies this particular acquisition, so a release after the lease
/// lapsed cannot remove a lock that someone else has since taken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockHandle {
    key: String,
    token: Uuid,
    lease: Duration,
    acquired_at: DateTime<Utc>,
}

impl LockHandle {
    /// Creates a handle for a fresh acquisition of `key`.
    pub fn new(key: impl Into<String>, lease: Duration) -> Self {
        Self {
            key: key.into(),
            token: Uuid::new_v4(),
            lease,
            acquired_at: Utc::now(),
        }
    }

    /// The protected resource.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Unique token of this acquisition.
    pub fn token(&self) -> Uuid {
        self.token
    }

    /// Lease after which the lock auto-releases.
    pub fn lease(&self) -> Duration {
        self.lease
    }

    /// When the lock was acquired.
    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    /// Returns true once the lease has run out.
    pub fn is_expired(&self) -> bool {
        let held = Utc::now().signed_duration_since(self.acquired_at);
        held.to_std().map_or(false, |held| held >= self.lease)
    }
}
