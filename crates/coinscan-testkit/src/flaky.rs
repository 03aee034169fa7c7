//! Fault injection around any warehouse.
//!
//! Wraps an inner warehouse and fails scripted calls with
//! `WarehouseError::Unavailable`, which is how abort-and-resume paths
//! get exercised without a real outage. Also counts calls so tests can
//! assert "zero fetches" properties.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use coinscan_warehouse::{Result, RowCursor, Warehouse, WarehouseError};

/// Fault-injecting warehouse wrapper.
///
/// Clones share state, so a test can keep a control handle while the
/// driver owns its own.
#[derive(Clone)]
pub struct FlakyWarehouse<W> {
    inner: Arc<W>,
    state: Arc<FlakyState>,
}

#[derive(Default)]
struct FlakyState {
    /// Ranges whose fetch fails.
    fail_ranges: Mutex<HashSet<(i64, i64)>>,
    /// Whether max-height queries fail.
    fail_max_height: AtomicBool,
    fetch_calls: AtomicU64,
    max_height_calls: AtomicU64,
}

impl<W: Warehouse> FlakyWarehouse<W> {
    /// Wrap a warehouse with no faults scripted.
    pub fn new(inner: W) -> Self {
        Self {
            inner: Arc::new(inner),
            state: Arc::new(FlakyState::default()),
        }
    }

    /// Script `fetch_range(start, end)` to fail.
    pub fn fail_range(&self, start: i64, end: i64) {
        self.state.fail_ranges.lock().unwrap().insert((start, end));
    }

    /// Script max-height queries to fail.
    pub fn fail_max_height(&self, fail: bool) {
        self.state.fail_max_height.store(fail, Ordering::SeqCst);
    }

    /// Clear all scripted faults.
    pub fn clear_faults(&self) {
        self.state.fail_ranges.lock().unwrap().clear();
        self.state.fail_max_height.store(false, Ordering::SeqCst);
    }

    /// Number of `fetch_range` calls observed, failed ones included.
    pub fn fetch_calls(&self) -> u64 {
        self.state.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of `max_available_height` calls observed.
    pub fn max_height_calls(&self) -> u64 {
        self.state.max_height_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<W: Warehouse> Warehouse for FlakyWarehouse<W> {
    async fn max_available_height(&self) -> Result<i64> {
        self.state.max_height_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_max_height.load(Ordering::SeqCst) {
            return Err(WarehouseError::Unavailable(
                "injected max-height failure".into(),
            ));
        }
        self.inner.max_available_height().await
    }

    async fn fetch_range(&self, start: i64, end: i64) -> Result<Box<dyn RowCursor>> {
        self.state.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_ranges.lock().unwrap().contains(&(start, end)) {
            return Err(WarehouseError::Unavailable(format!(
                "injected failure for range [{start}, {end}]"
            )));
        }
        self.inner.fetch_range(start, end).await
    }
}
