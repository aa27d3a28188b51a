//! TTL cache store for Roster user records.
//!
//! In-memory key → record cache with configurable capacity and expiration.

mod cache;

pub use cache::{CacheConfig, CacheStats, MemoryCacheStore};
