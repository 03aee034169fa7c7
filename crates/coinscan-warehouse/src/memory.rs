//! In-memory implementation of the Warehouse trait.
//!
//! For tests: rows are registered per creation height and served back
//! through the same paged-cursor interface as the real client. Handles
//! are cheap clones over shared state so a test can mutate the "remote"
//! dataset while a driver holds its own handle.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use coinscan_core::RawRow;

use crate::error::{Result, WarehouseError};
use crate::traits::{RowCursor, Warehouse};

/// Default rows per page served by the fake.
const DEFAULT_PAGE_SIZE: usize = 100;

/// In-memory warehouse fake.
#[derive(Clone)]
pub struct MemoryWarehouse {
    inner: Arc<RwLock<MemoryWarehouseInner>>,
}

struct MemoryWarehouseInner {
    /// Rows keyed by creation block height.
    rows: BTreeMap<i64, Vec<RawRow>>,
    /// Reported max height; defaults to the highest registered height.
    max_height: Option<i64>,
    page_size: usize,
}

impl MemoryWarehouse {
    /// Create an empty fake warehouse.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryWarehouseInner {
                rows: BTreeMap::new(),
                max_height: None,
                page_size: DEFAULT_PAGE_SIZE,
            })),
        }
    }

    /// Override the cursor page size.
    pub fn with_page_size(self, page_size: usize) -> Self {
        self.write().page_size = page_size.max(1);
        self
    }

    /// Register a row under its creation height.
    pub fn push_row(&self, height: i64, row: RawRow) {
        self.write().rows.entry(height).or_default().push(row);
    }

    /// Replace every row registered at the given height.
    pub fn replace_rows(&self, height: i64, rows: Vec<RawRow>) {
        self.write().rows.insert(height, rows);
    }

    /// Force the reported max height (e.g. heights with no coinbase
    /// rows at the tip).
    pub fn set_max_height(&self, height: i64) {
        self.write().max_height = Some(height);
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryWarehouseInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryWarehouseInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn max_available_height(&self) -> Result<i64> {
        let inner = self.read();
        inner
            .max_height
            .or_else(|| inner.rows.keys().next_back().copied())
            .ok_or_else(|| WarehouseError::Unavailable("empty fake warehouse".into()))
    }

    async fn fetch_range(&self, start: i64, end: i64) -> Result<Box<dyn RowCursor>> {
        if start > end {
            return Err(WarehouseError::InvalidQuery(format!(
                "empty range: start {start} > end {end}"
            )));
        }

        // Snapshot the range at fetch time, then page from memory.
        let inner = self.read();
        let rows: Vec<RawRow> = inner
            .rows
            .range(start..=end)
            .flat_map(|(_, rows)| rows.iter().cloned())
            .collect();
        let pages = rows
            .chunks(inner.page_size)
            .map(|chunk| chunk.to_vec())
            .collect();

        Ok(Box::new(MemoryCursor { pages }))
    }
}

struct MemoryCursor {
    pages: VecDeque<Vec<RawRow>>,
}

#[async_trait]
impl RowCursor for MemoryCursor {
    async fn next_page(&mut self) -> Result<Option<Vec<RawRow>>> {
        Ok(self.pages.pop_front())
    }
}
