//! SQLite backend for the Countrydle game store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every session write runs inside an
//! immediate transaction, so the rule checks and the quota updates it makes
//! are atomic with respect to concurrent requests.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
