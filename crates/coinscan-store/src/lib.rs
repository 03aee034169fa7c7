//! # Coinscan Store
//!
//! The local durable store: synchronized coinbase spend records plus the
//! single-value sync checkpoint, behind a trait so the driver is
//! storage-agnostic. The primary implementation is [`SqliteStore`], with
//! [`MemoryStore`] for tests.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`SpendPolicy`] - How a commit treats already-present keys
//! - [`BatchCommit`] - Per-batch write accounting
//!
//! ## Design Notes
//!
//! - **Insert-if-absent**: under the default policy an existing key is a
//!   silent no-op; a record's fields are never altered once written.
//! - **Atomic checkpointing**: [`Store::commit_batch`] writes a batch's
//!   records and advances the checkpoint in one transaction, so the
//!   checkpoint never points past data that is not durably committed.
//! - **Concurrent readers**: readers may open the database at any time
//!   and will see whole batches only, never a half-written one.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{BatchCommit, SpendPolicy, Store};

/// Metadata key under which the checkpoint is stored.
pub const CHECKPOINT_KEY: &str = "last_processed_height";

/// Checkpoint value meaning "nothing synced yet".
pub const CHECKPOINT_NONE: i64 = -1;
