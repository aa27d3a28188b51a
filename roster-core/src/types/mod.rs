//! Domain types for Roster.
//!
//! - [`UserRecord`]: One registered user
//! - [`RegisterUser`]: Caller-supplied registration fields
//! - [`UserFilter`]: Query-by-example filter
//! - [`Page`]: A page of results with the total count
//! - [`LockHandle`]: A held, leased lock

mod lock;
mod page;
mod user;

pub use lock::*;
pub use page::*;
pub use user::*;
