//! Storage error types.

use thiserror::Error;

/// Errors raised by the SQLite state store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Query or statement failure
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Opening the database failed
    #[error("Connection error: {0}")]
    Connection(#[from] diesel::ConnectionError),

    /// Embedded migrations could not be applied
    #[error("Migration error: {0}")]
    Migration(String),

    /// The connection mutex was poisoned by a panicking writer
    #[error("Connection lock poisoned")]
    Poisoned,
}
