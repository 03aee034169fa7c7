//! # Coinscan Testkit
//!
//! Testing utilities for coinscan.
//!
//! - [`FakeChain`] - a deterministic chain of coinbase outputs with
//!   scripted spends, loadable into a
//!   [`coinscan_warehouse::MemoryWarehouse`]
//! - [`FlakyWarehouse`] - fault injection around any warehouse, for
//!   exercising abort-and-resume paths
//! - [`generators`] - proptest strategies for raw warehouse scalars

pub mod fixtures;
pub mod flaky;
pub mod generators;

pub use fixtures::FakeChain;
pub use flaky::FlakyWarehouse;
