//! Test fixtures: a deterministic fake chain.
//!
//! One coinbase transaction per height, with a second output every
//! tenth height so multi-output coinbases are exercised. Spends are
//! scripted per output. Raw encodings alternate by height parity so
//! every normalizer path gets traffic in integration tests.

use std::collections::BTreeMap;

use coinscan_core::{
    timestamp_from_epoch, CoinbaseSpendRecord, OutputRef, RawNumber, RawRow, RawTimestamp,
};
use coinscan_warehouse::MemoryWarehouse;

/// Genesis block timestamp, seconds since epoch.
pub const GENESIS_TIME: i64 = 1_231_006_505;

/// Nominal block interval in seconds.
pub const BLOCK_INTERVAL: i64 = 600;

/// Coinbase value of the primary output.
pub const SUBSIDY_SATS: i64 = 5_000_000_000;

/// A deterministic chain of coinbase outputs.
pub struct FakeChain {
    max_height: i64,
    /// Scripted spends: `(creation_height, vout)` -> spending height.
    spends: BTreeMap<(i64, u32), i64>,
}

impl FakeChain {
    /// A chain with coinbase outputs for every height in `0..=max_height`.
    pub fn new(max_height: i64) -> Self {
        Self {
            max_height,
            spends: BTreeMap::new(),
        }
    }

    /// Highest height in the chain.
    pub fn max_height(&self) -> i64 {
        self.max_height
    }

    /// Extend the chain tip.
    pub fn grow_to(&mut self, max_height: i64) {
        assert!(max_height >= self.max_height, "chains only grow");
        self.max_height = max_height;
    }

    /// Deterministic coinbase txid for a height.
    pub fn txid(height: i64) -> String {
        format!("coinbase{height:08}")
    }

    /// Deterministic spending txid for an output.
    pub fn spend_txid(height: i64, vout: u32) -> String {
        format!("spend{height:08}v{vout}")
    }

    /// Block timestamp for a height, epoch seconds.
    pub fn block_time_epoch(height: i64) -> f64 {
        (GENESIS_TIME + height * BLOCK_INTERVAL) as f64
    }

    /// Block timestamp for a height, canonical RFC 3339 form.
    pub fn block_time_canonical(height: i64) -> String {
        timestamp_from_epoch("block_time", Self::block_time_epoch(height))
            .expect("fixture timestamps are whole seconds")
    }

    /// Output indexes present at a height.
    pub fn vouts_at(height: i64) -> Vec<u32> {
        if height % 10 == 0 {
            vec![0, 1]
        } else {
            vec![0]
        }
    }

    /// Number of coinbase outputs created in `start..=end`.
    pub fn output_count(&self, start: i64, end: i64) -> u64 {
        (start.max(0)..=end.min(self.max_height))
            .map(|h| Self::vouts_at(h).len() as u64)
            .sum()
    }

    /// Script a spend of `(created, vout)` at `spent_at`.
    pub fn mark_spent(&mut self, created: i64, vout: u32, spent_at: i64) {
        self.spends.insert((created, vout), spent_at);
    }

    fn value_sats(vout: u32) -> i64 {
        match vout {
            0 => SUBSIDY_SATS,
            _ => SUBSIDY_SATS / 2,
        }
    }

    /// The warehouse-native row for one output. Even heights use native
    /// encodings, odd heights textual ones.
    pub fn raw_row(&self, height: i64, vout: u32) -> RawRow {
        let spend = self.spends.get(&(height, vout)).copied();
        let textual = height % 2 == 1;

        let number = |v: i64| {
            if textual {
                RawNumber::Text(v.to_string())
            } else {
                RawNumber::Int(v)
            }
        };
        let timestamp = |h: i64| {
            if textual {
                RawTimestamp::Text(format!("{:E}", Self::block_time_epoch(h)))
            } else {
                RawTimestamp::EpochSeconds(Self::block_time_epoch(h))
            }
        };

        RawRow {
            coinbase_txid: Self::txid(height),
            output_index: number(vout as i64),
            value_sats: number(Self::value_sats(vout)),
            creation_block_height: number(height),
            creation_block_time: Some(timestamp(height)),
            spend_txid: spend.map(|_| Self::spend_txid(height, vout)),
            spend_block_height: spend.map(number),
            spend_block_time: spend.map(timestamp),
        }
    }

    /// The record a correct sync should store for one output.
    pub fn expected_record(&self, height: i64, vout: u32) -> CoinbaseSpendRecord {
        let spend = self.spends.get(&(height, vout)).copied();
        CoinbaseSpendRecord {
            coinbase_txid: Self::txid(height),
            output_index: vout,
            value_sats: Self::value_sats(vout),
            creation_block_height: height,
            creation_block_time: Self::block_time_canonical(height),
            spend_txid: spend.map(|_| Self::spend_txid(height, vout)),
            spend_block_height: spend,
            spend_block_time: spend.map(Self::block_time_canonical),
        }
    }

    /// Identity key of an output.
    pub fn output_ref(height: i64, vout: u32) -> OutputRef {
        OutputRef::new(Self::txid(height), vout)
    }

    /// Load (or reload) every row into a warehouse.
    pub fn populate(&self, warehouse: &MemoryWarehouse) {
        for height in 0..=self.max_height {
            let rows = Self::vouts_at(height)
                .into_iter()
                .map(|vout| self.raw_row(height, vout))
                .collect();
            warehouse.replace_rows(height, rows);
        }
        warehouse.set_max_height(self.max_height);
    }

    /// A freshly populated warehouse for this chain.
    pub fn warehouse(&self) -> MemoryWarehouse {
        let warehouse = MemoryWarehouse::new();
        self.populate(&warehouse);
        warehouse
    }
}
