//! Database schema migrations for SQLite.
//!
//! A simple versioned migration system: each migration transforms the
//! schema from version N to N+1, recorded in `schema_migrations`.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// Idempotent: safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, datetime('now'))",
                rusqlite::params![version],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per coinbase output. Spend columns are null while the
        -- output is thought unspent.
        CREATE TABLE coinbase_spends (
            coinbase_txid TEXT NOT NULL,
            output_index INTEGER NOT NULL,
            value_sats INTEGER NOT NULL,
            creation_block_height INTEGER NOT NULL,
            creation_block_time TEXT NOT NULL,   -- canonical RFC 3339 UTC
            spend_txid TEXT,
            spend_block_height INTEGER,
            spend_block_time TEXT,               -- canonical RFC 3339 UTC

            PRIMARY KEY (coinbase_txid, output_index)
        );

        -- Single-row-per-key metadata; holds only last_processed_height.
        CREATE TABLE metadata (
            key TEXT PRIMARY KEY,
            value TEXT
        );

        -- Downstream readers filter and aggregate by creation height.
        CREATE INDEX idx_spends_creation_height
            ON coinbase_spends(creation_block_height);
        "#,
    )?;

    Ok(())
}
