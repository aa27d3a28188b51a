//! # Roster Store
//!
//! User record storage for the Roster service.
//!
//! This crate provides multiple storage backends:
//!
//! - **Memory**: Fast in-memory storage for development and testing
//! - **File**: Snapshot-persisted storage for single-node deployments
//!
//! Both enforce the one-live-record-per-user-key rule and report violations as
//! `RosterError::DuplicateKey`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use roster_store::{MemoryUserStore, UserStore};
//!
//! let store = MemoryUserStore::new();
//! let id = store.save(record).await?;
//! let found = store.find_one(&UserFilter::by_key("U1")).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod file;
mod memory;

pub use file::FileUserStore;
pub use memory::MemoryUserStore;

// Re-export the trait from core
pub use roster_core::traits::UserStore;
