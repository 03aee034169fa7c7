//! Error types for the sync driver.

use thiserror::Error;

use coinscan_core::NormalizeError;
use coinscan_store::StoreError;
use coinscan_warehouse::WarehouseError;

use crate::plan::Batch;

/// Errors that can occur during a sync run.
///
/// Every variant aborts the whole run. Batch-scoped failures are wrapped
/// in [`SyncError::Batch`] so the operator can see which height range
/// was in flight; the checkpoint still points at the last committed
/// batch, so a plain re-invocation resumes.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration rejected before any store or network access.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Remote warehouse failure.
    #[error("warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    /// Local store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A row could not be normalized; the batch was not committed.
    #[error("normalization error: {0}")]
    Normalize(#[from] NormalizeError),

    /// A failure scoped to one batch, tagged with its height range.
    #[error("batch [{start}, {end}] failed: {source}")]
    Batch {
        start: i64,
        end: i64,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// Attach batch-range context, unless it is already attached.
    pub(crate) fn in_batch(self, batch: &Batch) -> Self {
        match self {
            already @ SyncError::Batch { .. } => already,
            other => SyncError::Batch {
                start: batch.start,
                end: batch.end,
                source: Box::new(other),
            },
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
