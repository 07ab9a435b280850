//! SQLite backend for the Lumen result store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Payloads and attributes are stored as
//! JSON text, so the tables behave like loosely-typed document collections.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
