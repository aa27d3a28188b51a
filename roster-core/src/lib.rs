//! # Roster Core
//!
//! Core types, errors, and traits for the Roster user registration service.
//!
//! This crate provides the foundational building blocks used by all other Roster crates:
//!
//! - **Types**: User records, query filters, pages, and lock handles
//! - **Errors**: The registration error taxonomy
//! - **Constants**: Lease, cache, and paging defaults
//! - **Traits**: Collaborator interfaces (lock, authorization, store, cache)
//!
//! ## Example
//!
//! ```rust
//! use roster_core::{RegisterUser, UserRecord};
//!
//! let request = RegisterUser::new("U1", "INV-7");
//! request.validate().unwrap();
//!
//! let record = UserRecord::from_registration(request, "Alice", "U1");
//! assert_eq!(record.version, 0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{Result, RosterError};
pub use traits::*;
pub use types::*;
