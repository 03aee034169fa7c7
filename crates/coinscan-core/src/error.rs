//! Error types for coinscan core.

use thiserror::Error;

/// Errors raised while normalizing a warehouse row.
///
/// Any of these aborts the batch that contained the offending row: the
/// batch is neither committed nor checkpointed, so a fixed re-run starts
/// from the same place.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// A float numeric carried a fractional part; casting would truncate.
    #[error("non-integral numeric value for {field}: {value}")]
    NonIntegralNumber { field: &'static str, value: f64 },

    /// A numeric value cannot be represented exactly as a signed 64-bit
    /// integer.
    #[error("numeric value for {field} out of exact i64 range: {value}")]
    OutOfRange { field: &'static str, value: String },

    /// A textual numeric failed to parse.
    #[error("unparseable numeric text for {field}: {value:?}")]
    BadNumericText { field: &'static str, value: String },

    /// An output index was negative.
    #[error("negative output index: {0}")]
    NegativeIndex(i64),

    /// A timestamp did not parse as RFC 3339 or epoch seconds.
    #[error("unparseable timestamp for {field}: {value:?}")]
    BadTimestamp { field: &'static str, value: String },

    /// A timestamp carried sub-second precision, which the canonical
    /// seconds-precision form would silently drop.
    #[error("sub-second timestamp for {field} cannot be canonicalized: {value}")]
    SubSecondTimestamp { field: &'static str, value: String },

    /// `creation_block_time` was null for the named output.
    #[error("missing creation_block_time for output {0}")]
    MissingCreationTime(String),
}
