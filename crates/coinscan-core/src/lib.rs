//! # Coinscan Core
//!
//! Pure primitives for coinscan: coinbase spend records, warehouse-native
//! raw scalars, and the normalization step between them.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over row data pulled from the remote warehouse.
//!
//! ## Key Types
//!
//! - [`CoinbaseSpendRecord`] - One coinbase output and its spend status
//! - [`OutputRef`] - The `(coinbase_txid, output_index)` identity key
//! - [`RawRow`] - A warehouse row before normalization
//! - [`normalize`] - The total cast from [`RawRow`] to [`CoinbaseSpendRecord`]
//!
//! ## Canonical timestamps
//!
//! Timestamps are stored as RFC 3339 UTC text at seconds precision so
//! that lexical comparison matches chronological order. See [`canonical`].

pub mod canonical;
pub mod error;
pub mod normalize;
pub mod raw;
pub mod record;

pub use canonical::{
    canonical_timestamp, timestamp_from_epoch, timestamp_from_raw, timestamp_from_text,
};
pub use error::NormalizeError;
pub use normalize::normalize;
pub use raw::{RawNumber, RawRow, RawTimestamp};
pub use record::{CoinbaseSpendRecord, OutputRef};
