//! # Roster Service
//!
//! The core user operations, written against the collaborator traits in
//! `roster-core` only:
//!
//! - [`RegistrationWorkflow`]: lock, authorize, build, save, unlock
//! - [`QueryCache`]: cache-aside lookup by user key
//! - [`PagedListing`]: count-then-page listing
//! - [`UserService`]: the facade callers use
//!
//! ## Example
//!
//! ```rust,ignore
//! use roster_service::UserService;
//!
//! let service = UserService::new(locks, authorizer, store).with_cache(cache);
//! let key = service.register(RegisterUser::new("U1", "INV-7"), "U1").await?;
//! let record = service.query_by_key(&key).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod listing;
mod query;
mod registration;
mod service;

#[cfg(test)]
mod fakes;

pub use listing::PagedListing;
pub use query::QueryCache;
pub use registration::{RegistrationWorkflow, WorkflowConfig};
pub use service::UserService;
