//! Service constants for Roster.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// LOCKING
// ═══════════════════════════════════════════════════════════════════════════════

/// Default lease for a registration lock, in seconds.
///
/// Must exceed the worst-case duration of one registration (authorization call
/// plus store write), otherwise the lease can lapse while the holder still runs.
pub const LOCK_LEASE_SECONDS: u64 = 60;

/// Namespace prefix for lock keys in the coordination store.
pub const LOCK_REGISTRY_PREFIX: &str = "roster-lock";

/// Default lock lease as a [`Duration`].
pub const fn default_lock_lease() -> Duration {
    Duration::from_secs(LOCK_LEASE_SECONDS)
}

// ═══════════════════════════════════════════════════════════════════════════════
// CACHING
// ═══════════════════════════════════════════════════════════════════════════════

/// Name of the user cache region.
pub const USER_CACHE_NAME: &str = "users";

/// Default maximum number of cached users.
pub const CACHE_MAX_ENTRIES: usize = 10_000;

/// Default cache entry lifetime, in seconds.
pub const CACHE_TTL_SECONDS: u64 = 3600;

// ═══════════════════════════════════════════════════════════════════════════════
// DEPENDENCIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Default per-call deadline for authorization and store calls, in milliseconds.
pub const DEPENDENCY_TIMEOUT_MS: u64 = 5_000;

/// Default HTTP timeout for the authorization client, in seconds.
pub const AUTH_TIMEOUT_SECONDS: u64 = 10;

// ═══════════════════════════════════════════════════════════════════════════════
// PAGING
// ═══════════════════════════════════════════════════════════════════════════════

/// Page size used when the caller does not supply one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size the API accepts.
pub const MAX_PAGE_SIZE: u32 = 500;
