//! SQLite-backed persistence for the Mindhaven offline queue.
//!
//! The engine persists its whole queue as one JSON document under a fixed
//! key; this crate supplies the durable key-value backend behind the core
//! `StateStore` port.

mod errors;
mod schema;
mod state_store;

pub use errors::StorageError;
pub use state_store::{SqliteStateStore, MIGRATIONS};
