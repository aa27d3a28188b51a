//! Error types for Roster.
//!
//! This module provides the error hierarchy for every Roster crate, using `thiserror`.
//! Lock contention is deliberately absent: a busy lock is an `Ok(None)` from
//! [`LockService::acquire`](crate::traits::LockService::acquire), not an error.

use thiserror::Error;

/// Result type alias using `RosterError`.
pub type Result<T> = std::result::Result<T, RosterError>;

/// Main error type for all Roster operations.
#[derive(Debug, Error)]
pub enum RosterError {
    // ═══════════════════════════════════════════════════════════════════════════
    // TERMINAL REGISTRATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Authorization resolved the user key to an empty name.
    #[error("User is not authorized: {0}")]
    Unauthorized(String),

    /// A non-deleted record with this user key already exists.
    #[error("User already exists: {0}")]
    DuplicateKey(String),

    /// Optimistic concurrency check failed on update.
    #[error("Version conflict for '{user_key}': expected {expected}, found {actual}")]
    VersionConflict {
        user_key: String,
        expected: u32,
        actual: u32,
    },

    /// No record matched.
    #[error("User not found: {0}")]
    NotFound(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSIENT DEPENDENCY ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The user store failed.
    #[error("Store error: {0}")]
    Store(String),

    /// The coordination store behind the lock service failed.
    #[error("Coordination store error: {0}")]
    Coordination(String),

    /// The authorization dependency failed (not an empty answer).
    #[error("Authorization call failed: {0}")]
    Authorization(String),

    /// HTTP transport failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// A dependency call exceeded its deadline.
    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION & CONFIGURATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Input validation failed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION & STORAGE
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RosterError {
    /// Returns true if the failure came from a dependency and a later attempt may succeed.
    ///
    /// Roster never retries these itself; the caller owns the retry policy.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RosterError::Store(_)
                | RosterError::Coordination(_)
                | RosterError::Authorization(_)
                | RosterError::Http(_)
                | RosterError::Timeout { .. }
                | RosterError::Io(_)
        )
    }

    /// Returns true if the error is a final answer about the request itself.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RosterError::Unauthorized(_)
                | RosterError::DuplicateKey(_)
                | RosterError::VersionConflict { .. }
                | RosterError::NotFound(_)
        )
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, RosterError::Validation(_))
    }

    /// Builds a timeout error for the named operation.
    pub fn timeout(operation: impl Into<String>, duration: std::time::Duration) -> Self {
        RosterError::Timeout {
            operation: operation.into(),
            millis: duration.as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use test_case::test_case;

    #[test]
    fn test_error_display() {
        let err = RosterError::VersionConflict {
            user_key: "U1".into(),
            expected: 3,
            actual: 4,
        };
        assert!(err.to_string().contains("U1"));
        assert!(err.to_string().contains('3'));
        assert!(err.to_string().contains('4'));
    }

    #[test_case(RosterError::Store("down".into()), true ; "store")]
    #[test_case(RosterError::Coordination("down".into()), true ; "coordination")]
    #[test_case(RosterError::Authorization("502".into()), true ; "authorization")]
    #[test_case(RosterError::timeout("save", Duration::from_millis(5)), true ; "timeout")]
    #[test_case(RosterError::Unauthorized("U1".into()), false ; "unauthorized")]
    #[test_case(RosterError::DuplicateKey("U1".into()), false ; "duplicate")]
    #[test_case(RosterError::Validation("blank".into()), false ; "validation")]
    fn test_transient_classification(err: RosterError, transient: bool) {
        assert_eq!(err.is_transient(), transient);
    }

    #[test]
    fn test_terminal_classification() {
        assert!(RosterError::Unauthorized("U1".into()).is_terminal());
        assert!(RosterError::DuplicateKey("U1".into()).is_terminal());
        assert!(!RosterError::Store("down".into()).is_terminal());
        assert!(RosterError::Validation("x".into()).is_validation_error());
    }

    #[test]
    fn test_timeout_display() {
        let err = RosterError::timeout("authorization", Duration::from_millis(250));
        assert_eq!(err.to_string(), "authorization timed out after 250ms");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid");
        let roster_result: Result<serde_json::Value> = json_result.map_err(RosterError::from);
        assert!(matches!(roster_result, Err(RosterError::Json(_))));
    }
}
