//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for coinscan. It uses rusqlite
//! with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use coinscan_core::{CoinbaseSpendRecord, OutputRef};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{BatchCommit, SpendPolicy, Store};
use crate::{CHECKPOINT_KEY, CHECKPOINT_NONE};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations run on spawn_blocking
/// to avoid blocking the async runtime. There is still exactly one
/// writer: the mutex serializes access to the single connection.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn lock(conn: &Arc<Mutex<Connection>>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|e| StoreError::Lock(e.to_string()))
}

fn join_err(e: tokio::task::JoinError) -> StoreError {
    StoreError::Task(e.to_string())
}

fn read_checkpoint(conn: &Connection) -> Result<i64> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            params![CHECKPOINT_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        None => Ok(CHECKPOINT_NONE),
        Some(text) => text.parse::<i64>().map_err(|_| {
            StoreError::Corrupt(format!("checkpoint value is not an integer: {:?}", text))
        }),
    }
}

fn write_checkpoint(conn: &Connection, height: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![CHECKPOINT_KEY, height.to_string()],
    )?;
    Ok(())
}

/// What writing one record did.
enum WriteOutcome {
    Inserted,
    Duplicate,
    SpendFilled,
}

fn write_record(
    conn: &Connection,
    record: &CoinbaseSpendRecord,
    policy: SpendPolicy,
) -> Result<WriteOutcome> {
    // Check-then-write: the outcome decides both the statement and the
    // commit accounting.
    let existing_spend: Option<Option<String>> = conn
        .query_row(
            "SELECT spend_txid FROM coinbase_spends
             WHERE coinbase_txid = ?1 AND output_index = ?2",
            params![record.coinbase_txid, record.output_index],
            |row| row.get(0),
        )
        .optional()?;

    match existing_spend {
        None => {
            conn.execute(
                "INSERT INTO coinbase_spends (
                    coinbase_txid, output_index, value_sats,
                    creation_block_height, creation_block_time,
                    spend_txid, spend_block_height, spend_block_time
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.coinbase_txid,
                    record.output_index,
                    record.value_sats,
                    record.creation_block_height,
                    record.creation_block_time,
                    record.spend_txid,
                    record.spend_block_height,
                    record.spend_block_time,
                ],
            )?;
            Ok(WriteOutcome::Inserted)
        }
        Some(None)
            if policy == SpendPolicy::RefreshSpends && record.spend_txid.is_some() =>
        {
            // Fill the null spend columns; everything else stays as
            // first written.
            conn.execute(
                "UPDATE coinbase_spends
                 SET spend_txid = ?3, spend_block_height = ?4, spend_block_time = ?5
                 WHERE coinbase_txid = ?1 AND output_index = ?2",
                params![
                    record.coinbase_txid,
                    record.output_index,
                    record.spend_txid,
                    record.spend_block_height,
                    record.spend_block_time,
                ],
            )?;
            Ok(WriteOutcome::SpendFilled)
        }
        Some(_) => Ok(WriteOutcome::Duplicate),
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<CoinbaseSpendRecord> {
    Ok(CoinbaseSpendRecord {
        coinbase_txid: row.get("coinbase_txid")?,
        output_index: row.get("output_index")?,
        value_sats: row.get("value_sats")?,
        creation_block_height: row.get("creation_block_height")?,
        creation_block_time: row.get("creation_block_time")?,
        spend_txid: row.get("spend_txid")?,
        spend_block_height: row.get("spend_block_height")?,
        spend_block_time: row.get("spend_block_time")?,
    })
}

const SELECT_COLUMNS: &str = "coinbase_txid, output_index, value_sats, \
     creation_block_height, creation_block_time, \
     spend_txid, spend_block_height, spend_block_time";

#[async_trait]
impl Store for SqliteStore {
    async fn last_processed_height(&self) -> Result<i64> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            read_checkpoint(&conn)
        })
        .await
        .map_err(join_err)?
    }

    async fn set_last_processed_height(&self, height: i64) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            write_checkpoint(&conn, height)
        })
        .await
        .map_err(join_err)?
    }

    async fn commit_batch(
        &self,
        records: Vec<CoinbaseSpendRecord>,
        checkpoint: i64,
        policy: SpendPolicy,
    ) -> Result<BatchCommit> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn)?;
            let tx = conn.transaction()?;

            let mut commit = BatchCommit::default();
            for record in &records {
                match write_record(&tx, record, policy)? {
                    WriteOutcome::Inserted => commit.inserted += 1,
                    WriteOutcome::Duplicate => commit.duplicates += 1,
                    WriteOutcome::SpendFilled => commit.spend_updates += 1,
                }
            }
            write_checkpoint(&tx, checkpoint)?;

            tx.commit()?;

            debug!(
                checkpoint,
                inserted = commit.inserted,
                duplicates = commit.duplicates,
                spend_updates = commit.spend_updates,
                "batch committed"
            );
            Ok(commit)
        })
        .await
        .map_err(join_err)?
    }

    async fn get_record(&self, key: &OutputRef) -> Result<Option<CoinbaseSpendRecord>> {
        let key = key.clone();
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            conn.query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM coinbase_spends
                     WHERE coinbase_txid = ?1 AND output_index = ?2"
                ),
                params![key.txid, key.vout],
                row_to_record,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
        .map_err(join_err)?
    }

    async fn record_count(&self) -> Result<u64> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM coinbase_spends", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
        .map_err(join_err)?
    }

    async fn unspent_count(&self) -> Result<u64> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM coinbase_spends WHERE spend_txid IS NULL",
                [],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
        .map_err(join_err)?
    }

    async fn records_in_height_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<CoinbaseSpendRecord>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM coinbase_spends
                 WHERE creation_block_height BETWEEN ?1 AND ?2
                 ORDER BY creation_block_height, coinbase_txid, output_index"
            ))?;
            let records = stmt
                .query_map(params![start, end], row_to_record)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
        .map_err(join_err)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CHECKPOINT_NONE;

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

    fn spent_record(txid: &str, vout: u32, height: i64) -> CoinbaseSpendRecord {
        CoinbaseSpendRecord {
            spend_txid: Some(format!("spend-{txid}")),
            spend_block_height: Some(height + 100),
            spend_block_time: Some("2009-01-12T03:30:25Z".to_string()),
            ..record(txid, vout, height)
        }
    }

    #[tokio::test]
    async fn fresh_store_has_no_checkpoint() {
        let store = SqliteStore::open_memory().unwrap();
        assert_eq!(store.last_processed_height().await.unwrap(), CHECKPOINT_NONE);
    }

    #[tokio::test]
    async fn commit_batch_writes_records_and_checkpoint_together() {
        let store = SqliteStore::open_memory().unwrap();

        let commit = store
            .commit_batch(
                vec![record("a", 0, 1), record("b", 0, 2)],
                2,
                SpendPolicy::InsertIfAbsent,
            )
            .await
            .unwrap();

        assert_eq!(commit.inserted, 2);
        assert_eq!(commit.duplicates, 0);
        assert_eq!(store.last_processed_height().await.unwrap(), 2);
        assert_eq!(store.record_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn insert_if_absent_never_touches_existing_rows() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .commit_batch(vec![record("a", 0, 1)], 1, SpendPolicy::InsertIfAbsent)
            .await
            .unwrap();

        // Re-observe the same key, now spent.
        let commit = store
            .commit_batch(vec![spent_record("a", 0, 1)], 1, SpendPolicy::InsertIfAbsent)
            .await
            .unwrap();
        assert_eq!(commit.inserted, 0);
        assert_eq!(commit.duplicates, 1);

        let stored = store
            .get_record(&OutputRef::new("a", 0))
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.is_spent());
    }

    #[tokio::test]
    async fn refresh_spends_fills_null_spend_columns() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .commit_batch(vec![record("a", 0, 1)], 1, SpendPolicy::RefreshSpends)
            .await
            .unwrap();

        let commit = store
            .commit_batch(vec![spent_record("a", 0, 1)], 1, SpendPolicy::RefreshSpends)
            .await
            .unwrap();
        assert_eq!(commit.spend_updates, 1);

        let stored = store
            .get_record(&OutputRef::new("a", 0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.spend_txid.as_deref(), Some("spend-a"));
        assert_eq!(stored.spend_block_height, Some(101));
    }

    #[tokio::test]
    async fn refresh_spends_never_replaces_a_recorded_spend() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .commit_batch(vec![spent_record("a", 0, 1)], 1, SpendPolicy::RefreshSpends)
            .await
            .unwrap();

        let mut other = spent_record("a", 0, 1);
        other.spend_txid = Some("different".to_string());
        let commit = store
            .commit_batch(vec![other], 1, SpendPolicy::RefreshSpends)
            .await
            .unwrap();
        assert_eq!(commit.duplicates, 1);
        assert_eq!(commit.spend_updates, 0);

        let stored = store
            .get_record(&OutputRef::new("a", 0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.spend_txid.as_deref(), Some("spend-a"));
    }

    #[tokio::test]
    async fn refresh_spends_never_clears_a_spend() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .commit_batch(vec![spent_record("a", 0, 1)], 1, SpendPolicy::RefreshSpends)
            .await
            .unwrap();

        // A later pass observing the output as unspent leaves it spent.
        let commit = store
            .commit_batch(vec![record("a", 0, 1)], 1, SpendPolicy::RefreshSpends)
            .await
            .unwrap();
        assert_eq!(commit.duplicates, 1);

        let stored = store
            .get_record(&OutputRef::new("a", 0))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_spent());
    }

    #[tokio::test]
    async fn read_helpers_count_and_filter() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .commit_batch(
                vec![
                    record("a", 0, 1),
                    spent_record("b", 0, 2),
                    record("c", 0, 5),
                ],
                5,
                SpendPolicy::InsertIfAbsent,
            )
            .await
            .unwrap();

        assert_eq!(store.record_count().await.unwrap(), 3);
        assert_eq!(store.unspent_count().await.unwrap(), 2);

        let range = store.records_in_height_range(1, 2).await.unwrap();
        assert_eq!(range.len(), 2);
        assert_eq!(range[0].coinbase_txid, "a");
        assert_eq!(range[1].coinbase_txid, "b");
    }

    #[tokio::test]
    async fn store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coinscan.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .commit_batch(vec![record("a", 0, 1)], 1, SpendPolicy::InsertIfAbsent)
                .await
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.last_processed_height().await.unwrap(), 1);
        assert_eq!(store.record_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn checkpoint_can_be_forced_for_rescan() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .commit_batch(vec![record("a", 0, 1)], 99, SpendPolicy::InsertIfAbsent)
            .await
            .unwrap();

        store.set_last_processed_height(CHECKPOINT_NONE).await.unwrap();
        assert_eq!(store.last_processed_height().await.unwrap(), CHECKPOINT_NONE);
        // Records are untouched by a checkpoint rewind.
        assert_eq!(store.record_count().await.unwrap(), 1);
    }
}
