//! Error types for the warehouse module.

use thiserror::Error;

/// Errors that can occur talking to the remote warehouse.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// Transport, auth, or quota failure. Fatal for the current run;
    /// nothing is retried automatically. The checkpoint makes a later
    /// re-invocation resume where this run stopped.
    #[error("warehouse unavailable: {0}")]
    Unavailable(String),

    /// Malformed query parameters or template. A programming error, not
    /// something a re-invocation fixes.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The warehouse answered, but the response did not have the
    /// expected shape.
    #[error("malformed warehouse response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for WarehouseError {
    fn from(e: reqwest::Error) -> Self {
        WarehouseError::Unavailable(e.to_string())
    }
}

/// Configuration errors, raised before any query is issued.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The billing project identity is required.
    #[error("billing project is required")]
    MissingBillingProject,

    /// The access token is required.
    #[error("access token is required")]
    MissingAccessToken,

    /// Page size must be at least one row.
    #[error("page size must be at least 1")]
    ZeroPageSize,
}

/// Result type for warehouse operations.
pub type Result<T> = std::result::Result<T, WarehouseError>;
