//! # Coinscan Warehouse
//!
//! The remote query executor: issues the two query shapes the sync
//! engine needs against an analytical warehouse and hands rows back as
//! paged cursors.
//!
//! ## Key Types
//!
//! - [`Warehouse`] - The async trait for remote queries
//! - [`RowCursor`] - Pull-based, page-at-a-time row iteration
//! - [`BigQueryWarehouse`] - Google BigQuery REST implementation
//! - [`MemoryWarehouse`] - In-memory fake for tests
//! - [`BigQueryConfig`] - Explicit configuration, no ambient env reads
//!
//! ## Query shapes
//!
//! Exactly two logical queries exist: the current maximum block height,
//! and the coinbase-output range join that decorates each output with
//! its spend status as of the query moment. The join runs remotely so
//! the input-side dataset never crosses the wire.

pub mod bigquery;
pub mod config;
pub mod error;
pub mod memory;
pub mod traits;

pub use bigquery::BigQueryWarehouse;
pub use config::BigQueryConfig;
pub use error::{ConfigError, Result, WarehouseError};
pub use memory::MemoryWarehouse;
pub use traits::{RowCursor, Warehouse};
