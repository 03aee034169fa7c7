//! Strong type definitions for synchronized coinbase outputs.
//!
//! The identity key is a newtype so store and driver code cannot mix up
//! txids and spend txids at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity key of a coinbase output: `(coinbase_txid, output_index)`.
///
/// Two rows with the same `OutputRef` describe the same on-chain output.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputRef {
    /// Transaction id of the coinbase transaction, hex text.
    pub txid: String,
    /// Index of the output within that transaction.
    pub vout: u32,
}

impl OutputRef {
    /// Create a new output reference.
    pub fn new(txid: impl Into<String>, vout: u32) -> Self {
        Self {
            txid: txid.into(),
            vout,
        }
    }
}

impl fmt::Debug for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputRef({}:{})", self.txid, self.vout)
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// One coinbase output together with its spend status as of the sync
/// pass that first observed it.
///
/// Rows are written exactly once per [`OutputRef`] and, under the
/// default store policy, never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinbaseSpendRecord {
    /// Coinbase transaction id (identity key, with `output_index`).
    pub coinbase_txid: String,
    /// Output index within the coinbase transaction.
    pub output_index: u32,
    /// Output value in satoshis. Immutable once written.
    pub value_sats: i64,
    /// Height of the block that created the output.
    pub creation_block_height: i64,
    /// Canonical RFC 3339 UTC timestamp of the creating block. Never null.
    pub creation_block_time: String,
    /// Transaction that spent this output, if spent at observation time.
    pub spend_txid: Option<String>,
    /// Height of the spending block, if spent.
    pub spend_block_height: Option<i64>,
    /// Canonical RFC 3339 UTC timestamp of the spending block, if spent.
    pub spend_block_time: Option<String>,
}

impl CoinbaseSpendRecord {
    /// The identity key of this record.
    pub fn output_ref(&self) -> OutputRef {
        OutputRef::new(self.coinbase_txid.clone(), self.output_index)
    }

    /// Whether the output was observed as spent.
    ///
    /// The three spend fields are set together, so `spend_txid` alone
    /// decides.
    pub fn is_spent(&self) -> bool {
        self.spend_txid.is_some()
    }
}
