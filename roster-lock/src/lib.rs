//! # Roster Lock
//!
//! Non-blocking, leased mutual exclusion per key.
//!
//! - **MemoryLockService**: set-if-absent with a lease over a concurrent map, for
//!   single-process deployments and tests
//! - **LockGuard**: scoped hold that always gives the lock back
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use roster_lock::{LockGuard, MemoryLockService};
//!
//! let locks = Arc::new(MemoryLockService::new());
//! if let Some(guard) = LockGuard::try_acquire(locks, "U1").await? {
//!     // exclusive section
//!     guard.release().await;
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod guard;
mod memory;

pub use guard::LockGuard;
pub use memory::{LockConfig, MemoryLockService};

// Re-export the trait from core
pub use roster_core::traits::LockService;
