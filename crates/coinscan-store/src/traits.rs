//! Store trait: the abstract interface for record and checkpoint
//! persistence.
//!
//! The checkpoint lives behind the same trait as the records because the
//! two must move together: a batch's inserts and its checkpoint advance
//! are one durable commit, never two.

use async_trait::async_trait;
use coinscan_core::{CoinbaseSpendRecord, OutputRef};

use crate::error::Result;

/// How [`Store::commit_batch`] treats a record whose key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpendPolicy {
    /// Never touch an existing row. A key observed unspent in an early
    /// pass keeps reporting unspent forever, even if a later pass sees
    /// it spent. This reproduces the original collector exactly.
    #[default]
    InsertIfAbsent,

    /// Fill in the three spend columns when an existing row has a null
    /// `spend_txid` and the new observation's is non-null. Value and
    /// creation fields are never altered, and a recorded spend is never
    /// cleared or replaced.
    RefreshSpends,
}

/// Accounting for one committed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchCommit {
    /// Records newly inserted.
    pub inserted: u64,
    /// Records whose key already existed and were left untouched.
    pub duplicates: u64,
    /// Existing records whose spend columns were filled in
    /// (only under [`SpendPolicy::RefreshSpends`]).
    pub spend_updates: u64,
}

/// The Store trait: async interface for record and checkpoint persistence.
///
/// All methods are async; the SQLite backend runs them on
/// `spawn_blocking` to keep the runtime unblocked.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────
    // Checkpoint Operations
    // ─────────────────────────────────────────────────────────────────────

    /// The highest block height whose data is durably committed, or
    /// [`crate::CHECKPOINT_NONE`] when nothing has been synced.
    async fn last_processed_height(&self) -> Result<i64>;

    /// Upsert the checkpoint on its own.
    ///
    /// The sync driver never calls this directly: batch commits go
    /// through [`Store::commit_batch`], which advances the checkpoint in
    /// the same transaction as the data. This exists for operator
    /// tooling (e.g. forcing a re-scan).
    async fn set_last_processed_height(&self, height: i64) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────
    // Batch Commit
    // ─────────────────────────────────────────────────────────────────────

    /// Write a batch's records under `policy` and advance the checkpoint
    /// to `checkpoint`, all in one durable transaction.
    ///
    /// Either everything in the batch lands together with the new
    /// checkpoint, or nothing does. Duplicate keys are tolerated per the
    /// policy, which makes re-runs after a partial failure idempotent.
    async fn commit_batch(
        &self,
        records: Vec<CoinbaseSpendRecord>,
        checkpoint: i64,
        policy: SpendPolicy,
    ) -> Result<BatchCommit>;

    // ─────────────────────────────────────────────────────────────────────
    // Read Operations (tests and downstream consumers)
    // ─────────────────────────────────────────────────────────────────────

    /// Fetch one record by identity key.
    async fn get_record(&self, key: &OutputRef) -> Result<Option<CoinbaseSpendRecord>>;

    /// Total number of synchronized records.
    async fn record_count(&self) -> Result<u64>;

    /// Number of records with no observed spend.
    async fn unspent_count(&self) -> Result<u64>;

    /// Records created in `start..=end`, ordered by creation height then
    /// key.
    async fn records_in_height_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<CoinbaseSpendRecord>>;
}
