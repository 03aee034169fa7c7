//! Warehouse-native row representation, before normalization.
//!
//! The remote warehouse hands back scalars in whatever encoding its wire
//! format uses: native 64-bit integers, wide/float numerics, or JSON
//! string renderings. [`RawNumber`] and [`RawTimestamp`] capture those
//! encodings losslessly so the normalizer can decide whether an exact
//! cast exists.

/// A numeric scalar as received from the warehouse.
#[derive(Debug, Clone, PartialEq)]
pub enum RawNumber {
    /// A native signed 64-bit integer.
    Int(i64),
    /// A floating-point encoding (wide numerics decoded as doubles).
    Float(f64),
    /// A textual encoding, e.g. BigQuery's JSON `"5000000000"`.
    Text(String),
}

/// A timestamp scalar as received from the warehouse.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTimestamp {
    /// Seconds since the Unix epoch, possibly fractional on the wire.
    EpochSeconds(f64),
    /// A textual encoding: RFC 3339 or an epoch-seconds float string.
    Text(String),
}

/// One row of the coinbase/spend join, exactly as fetched.
///
/// Field order and row order are unspecified by the warehouse; only the
/// field names carry meaning. Spend-side fields are `None` when the
/// output was unspent at query time (the LEFT JOIN produced nulls).
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub coinbase_txid: String,
    pub output_index: RawNumber,
    pub value_sats: RawNumber,
    pub creation_block_height: RawNumber,
    /// Null only on a malformed source row; normalization rejects that.
    pub creation_block_time: Option<RawTimestamp>,
    pub spend_txid: Option<String>,
    pub spend_block_height: Option<RawNumber>,
    pub spend_block_time: Option<RawTimestamp>,
}
