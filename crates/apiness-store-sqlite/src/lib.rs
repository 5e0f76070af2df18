//! SQLite backend for Apiness stores.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. One [`SqliteStore`] handle exists per
//! store file (or the shared in-memory store); see
//! [`apiness_core::store::ConnectionRegistry`].

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteConnector, SqliteStore};

#[cfg(test)]
mod tests;
