//! SQLite backend for the Raksha emergency registry and location trail.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Every `call` executes whole on
//! that thread, which is what makes the registry's check-and-insert atomic
//! against concurrent triggers.

mod encode;
mod schema;
mod store;

pub use store::SqliteStore;
