//! SQLite backend for the Folio publishing store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Documents are kept as JSON; the nodes
//! of a simple smart answer live in their own table so they can be written
//! one at a time.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
