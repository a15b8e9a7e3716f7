//! SQLite backend for the Herald content store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Each logical operation runs
//! inside a single connection call, which also serialises the bot front end
//! against the expiry scanner — one connection is the write lock.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
