//! The sync driver: one resumable run over the unsynchronized range.
//!
//! Per run: read the checkpoint, ask the warehouse for the current max
//! height, tile `[checkpoint + 1, max]` into batches, and for each batch
//! fetch, normalize, and commit atomically with the checkpoint advance.
//! Any error aborts the run with the failing batch range attached.

use std::sync::Arc;

use tracing::{info, warn};

use coinscan_core::{normalize, CoinbaseSpendRecord};
use coinscan_store::Store;
use coinscan_warehouse::Warehouse;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::plan::{Batch, BatchPlan};
use crate::progress::ProgressObserver;

/// Result of one sync run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// First height this run intended to cover.
    pub start_height: i64,
    /// Last height this run intended to cover (the max at run start).
    pub end_height: i64,
    /// Batches durably committed.
    pub batches_committed: u64,
    /// Records newly inserted.
    pub records_inserted: u64,
    /// Records whose key already existed.
    pub duplicate_records: u64,
    /// Existing records whose spend columns were filled
    /// (RefreshSpends policy only).
    pub spend_updates: u64,
    /// Heights durably committed by this run.
    pub heights_covered: u64,
    /// True when the store already covered the remote max height and
    /// the run did nothing.
    pub up_to_date: bool,
}

/// Drives one synchronization run.
///
/// Strictly sequential: one warehouse connection, one store, one batch
/// in flight. A terminated run leaves the store consistent and
/// resumable because every commit carries its checkpoint.
pub struct SyncDriver<W: Warehouse, S: Store> {
    warehouse: W,
    store: Arc<S>,
    config: SyncConfig,
    progress: Option<Box<dyn ProgressObserver>>,
}

impl<W: Warehouse, S: Store> SyncDriver<W, S> {
    /// Create a driver. Fails on unusable configuration, before any
    /// store or network access.
    pub fn new(warehouse: W, store: Arc<S>, config: SyncConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            warehouse,
            store,
            config,
            progress: None,
        })
    }

    /// Attach a progress observer.
    pub fn with_progress(mut self, observer: Box<dyn ProgressObserver>) -> Self {
        self.progress = Some(observer);
        self
    }

    /// Run to completion or first error.
    pub async fn run(&mut self) -> Result<SyncReport> {
        let checkpoint = self.store.last_processed_height().await?;
        let max_height = self.warehouse.max_available_height().await?;

        let start = checkpoint + 1;
        let mut report = SyncReport {
            start_height: start,
            end_height: max_height,
            ..SyncReport::default()
        };

        if start > max_height {
            info!(checkpoint, max_height, "store already up to date");
            report.up_to_date = true;
            return Ok(report);
        }

        let total = (max_height - start + 1) as u64;
        info!(start, end = max_height, total, "sync range determined");

        for batch in BatchPlan::new(start, max_height, self.config.batch_size) {
            let records = self
                .fetch_batch(&batch)
                .await
                .map_err(|e| abort(&batch, e))?;

            let commit = self
                .store
                .commit_batch(records, batch.end, self.config.spend_policy)
                .await
                .map_err(|e| abort(&batch, SyncError::from(e)))?;

            report.batches_committed += 1;
            report.records_inserted += commit.inserted;
            report.duplicate_records += commit.duplicates;
            report.spend_updates += commit.spend_updates;
            report.heights_covered += batch.heights();

            info!(
                batch_start = batch.start,
                batch_end = batch.end,
                inserted = commit.inserted,
                duplicates = commit.duplicates,
                "batch committed"
            );

            if let Some(observer) = self.progress.as_mut() {
                observer.on_progress(report.heights_covered, total);
            }
        }

        info!(
            batches = report.batches_committed,
            records = report.records_inserted,
            "sync run complete"
        );
        Ok(report)
    }

    /// Fetch and normalize every row of one batch.
    ///
    /// Pages are pulled one at a time; only the current batch is ever
    /// resident, never the whole range.
    async fn fetch_batch(&self, batch: &Batch) -> Result<Vec<CoinbaseSpendRecord>> {
        let mut cursor = self.warehouse.fetch_range(batch.start, batch.end).await?;
        let mut records = Vec::new();
        while let Some(page) = cursor.next_page().await? {
            records.reserve(page.len());
            for raw in page {
                records.push(normalize(raw)?);
            }
        }
        Ok(records)
    }
}

fn abort(batch: &Batch, error: SyncError) -> SyncError {
    let error = error.in_batch(batch);
    warn!(
        batch_start = batch.start,
        batch_end = batch.end,
        %error,
        "sync run aborted"
    );
    error
}
