//! In-memory implementation of the Store trait.
//!
//! Primarily for testing. Same semantics as SQLite, including the
//! all-or-nothing batch commit, but nothing is persisted.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use coinscan_core::{CoinbaseSpendRecord, OutputRef};

use crate::error::{Result, StoreError};
use crate::traits::{BatchCommit, SpendPolicy, Store};
use crate::CHECKPOINT_NONE;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Records keyed by identity, ordered for stable range reads.
    records: BTreeMap<OutputRef, CoinbaseSpendRecord>,
    /// The checkpoint; `None` until the first commit.
    checkpoint: Option<i64>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                records: BTreeMap::new(),
                checkpoint: None,
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_err<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Lock(e.to_string())
}

#[async_trait]
impl Store for MemoryStore {
    async fn last_processed_height(&self) -> Result<i64> {
        let inner = self.inner.read().map_err(lock_err)?;
        Ok(inner.checkpoint.unwrap_or(CHECKPOINT_NONE))
    }

    async fn set_last_processed_height(&self, height: i64) -> Result<()> {
        let mut inner = self.inner.write().map_err(lock_err)?;
        inner.checkpoint = Some(height);
        Ok(())
    }

    async fn commit_batch(
        &self,
        records: Vec<CoinbaseSpendRecord>,
        checkpoint: i64,
        policy: SpendPolicy,
    ) -> Result<BatchCommit> {
        let mut inner = self.inner.write().map_err(lock_err)?;

        // The write lock is held for the whole batch, so readers observe
        // the same all-or-nothing behavior as a SQLite transaction.
        let mut commit = BatchCommit::default();
        for record in records {
            let key = record.output_ref();
            match inner.records.get_mut(&key) {
                None => {
                    inner.records.insert(key, record);
                    commit.inserted += 1;
                }
                Some(existing)
                    if policy == SpendPolicy::RefreshSpends
                        && existing.spend_txid.is_none()
                        && record.spend_txid.is_some() =>
                {
                    existing.spend_txid = record.spend_txid;
                    existing.spend_block_height = record.spend_block_height;
                    existing.spend_block_time = record.spend_block_time;
                    commit.spend_updates += 1;
                }
                Some(_) => commit.duplicates += 1,
            }
        }
        inner.checkpoint = Some(checkpoint);

        Ok(commit)
    }

    async fn get_record(&self, key: &OutputRef) -> Result<Option<CoinbaseSpendRecord>> {
        let inner = self.inner.read().map_err(lock_err)?;
        Ok(inner.records.get(key).cloned())
    }

    async fn record_count(&self) -> Result<u64> {
        let inner = self.inner.read().map_err(lock_err)?;
        Ok(inner.records.len() as u64)
    }

    async fn unspent_count(&self) -> Result<u64> {
        let inner = self.inner.read().map_err(lock_err)?;
        Ok(inner.records.values().filter(|r| !r.is_spent()).count() as u64)
    }

    async fn records_in_height_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<CoinbaseSpendRecord>> {
        let inner = self.inner.read().map_err(lock_err)?;
        let mut records: Vec<CoinbaseSpendRecord> = inner
            .records
            .values()
            .filter(|r| r.creation_block_height >= start && r.creation_block_height <= end)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            (a.creation_block_height, &a.coinbase_txid, a.output_index)
                .cmp(&(b.creation_block_height, &b.coinbase_txid, b.output_index))
        });
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(txid: &str, vout: u32, height: i64) -> CoinbaseSpendRecord {
        CoinbaseSpendRecord {
            coinbase_txid: txid.to_string(),
            output_index: vout,
            value_sats: 5_000_000_000,
            creation_block_height: height,
            creation_block_time: "2009-01-03T18:15:05Z".to_string(),
            spend_txid: None,
            spend_block_height: None,
            spend_block_time: None,
        }
    }

    #[tokio::test]
    async fn matches_sqlite_checkpoint_semantics() {
        let store = MemoryStore::new();
        assert_eq!(store.last_processed_height().await.unwrap(), CHECKPOINT_NONE);

        store
            .commit_batch(vec![record("a", 0, 1)], 1, SpendPolicy::InsertIfAbsent)
            .await
            .unwrap();
        assert_eq!(store.last_processed_height().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_keys_are_no_ops() {
        let store = MemoryStore::new();
        store
            .commit_batch(vec![record("a", 0, 1)], 1, SpendPolicy::InsertIfAbsent)
            .await
            .unwrap();

        let mut changed = record("a", 0, 1);
        changed.value_sats = 1;
        let commit = store
            .commit_batch(vec![changed], 1, SpendPolicy::InsertIfAbsent)
            .await
            .unwrap();
        assert_eq!(commit.duplicates, 1);

        let stored = store
            .get_record(&OutputRef::new("a", 0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.value_sats, 5_000_000_000);
    }

    #[tokio::test]
    async fn range_reads_are_ordered() {
        let store = MemoryStore::new();
        store
            .commit_batch(
                vec![record("z", 0, 3), record("a", 1, 1), record("a", 0, 1)],
                3,
                SpendPolicy::InsertIfAbsent,
            )
            .await
            .unwrap();

        let range = store.records_in_height_range(0, 3).await.unwrap();
        let keys: Vec<(i64, String, u32)> = range
            .iter()
            .map(|r| (r.creation_block_height, r.coinbase_txid.clone(), r.output_index))
            .collect();
        assert_eq!(
            keys,
            vec![
                (1, "a".to_string(), 0),
                (1, "a".to_string(), 1),
                (3, "z".to_string(), 0),
            ]
        );
    }
}
