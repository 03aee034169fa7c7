//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
///
/// All of these are fatal for the current run. The store is never left
/// with a partially written batch, so a later run resumes cleanly.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored data failed to parse (e.g. a corrupt checkpoint value).
    #[error("corrupt store data: {0}")]
    Corrupt(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The connection mutex was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    Lock(String),

    /// The blocking task running a store operation failed to complete.
    #[error("store task failed: {0}")]
    Task(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
