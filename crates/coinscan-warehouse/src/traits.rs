//! Warehouse trait: the abstract interface for remote range queries.
//!
//! Implementations include the BigQuery REST client (primary) and an
//! in-memory fake (for tests).

use async_trait::async_trait;
use coinscan_core::RawRow;

use crate::error::Result;

/// Pull-based row iteration, one page at a time.
///
/// Only the current page is ever materialized; the full range never is.
/// Row order within and across pages is unspecified and must not be
/// relied upon.
#[async_trait]
pub trait RowCursor: Send {
    /// The next page of rows, or `None` when the result set is
    /// exhausted. Pages are never empty.
    async fn next_page(&mut self) -> Result<Option<Vec<RawRow>>>;
}

/// The Warehouse trait: async interface for the two remote query shapes.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Highest block height currently available in the remote dataset.
    ///
    /// Fails with [`crate::WarehouseError::Unavailable`] on transport or
    /// auth errors; fatal for the run, the operator re-invokes.
    async fn max_available_height(&self) -> Result<i64>;

    /// Every coinbase output created in `start..=end`, left-joined
    /// against the spending-input side so unspent outputs appear with
    /// null spend fields.
    ///
    /// Fails with [`crate::WarehouseError::InvalidQuery`] when
    /// `start > end`; the caller plans batches so this never happens in
    /// a correct run.
    async fn fetch_range(&self, start: i64, end: i64) -> Result<Box<dyn RowCursor>>;
}
