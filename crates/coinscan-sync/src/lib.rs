//! # Coinscan Sync
//!
//! The resumable batch synchronization driver: determines what height
//! range is not yet synchronized, fetches it from the warehouse in
//! bounded batches, normalizes the rows, and commits each batch together
//! with its checkpoint advance in one durable transaction.
//!
//! ## Key Properties
//!
//! - **Idempotent resume**: re-running after any interruption converges
//!   to the same store state as an uninterrupted run, because the
//!   checkpoint only advances atomically with data and writes tolerate
//!   duplicate keys.
//! - **Exact coverage**: one run's batches tile the unsynchronized range
//!   with no gaps and no overlaps.
//! - **Fail fast**: any batch error aborts the whole run; nothing is
//!   retried within a run. The checkpoint stays at the last committed
//!   batch boundary.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use coinscan_store::SqliteStore;
//! use coinscan_sync::{SyncConfig, SyncDriver};
//! use coinscan_warehouse::{BigQueryConfig, BigQueryWarehouse};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse =
//!         BigQueryWarehouse::new(BigQueryConfig::new("my-billing-project", "token"))?;
//!     let store = Arc::new(SqliteStore::open("coinbase_spending.db")?);
//!
//!     let mut driver = SyncDriver::new(warehouse, store, SyncConfig::default())?;
//!     let report = driver.run().await?;
//!     println!("synced {} heights", report.heights_covered);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod plan;
pub mod progress;

pub use config::SyncConfig;
pub use driver::{SyncDriver, SyncReport};
pub use error::{Result, SyncError};
pub use plan::{Batch, BatchPlan};
pub use progress::ProgressObserver;
