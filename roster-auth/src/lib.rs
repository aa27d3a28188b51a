//! # Roster Auth
//!
//! Authorization clients for the registration workflow.
//!
//! - **HttpAuthorizationClient**: asks the authorization service over HTTP
//! - **StaticAuthorizer**: fixed key → name table for development and tests
//!
//! Both implement [`AuthorizationClient`]: `Some(name)` for an authorized key,
//! `None` for an unauthorized one, `Err` when the service could not answer.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod http;
mod static_table;

pub use http::{AuthConfig, HttpAuthorizationClient};
pub use static_table::StaticAuthorizer;

// Re-export the trait from core
pub use roster_core::traits::AuthorizationClient;
