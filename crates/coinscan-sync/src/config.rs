//! Configuration for sync behavior.

use coinscan_store::SpendPolicy;

use crate::error::SyncError;

/// Default number of heights per batch.
pub const DEFAULT_BATCH_SIZE: u64 = 1_000;

/// Configuration for [`crate::SyncDriver`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Heights per batch. Each batch is one fetch plus one atomic
    /// commit, so this is the fetch-size / commit-frequency tradeoff.
    pub batch_size: u64,
    /// How commits treat keys that already exist in the store.
    pub spend_policy: SpendPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            spend_policy: SpendPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Reject unusable configuration before the run touches anything.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.batch_size == 0 {
            return Err(SyncError::Config("batch size must be at least 1".into()));
        }
        Ok(())
    }
}
