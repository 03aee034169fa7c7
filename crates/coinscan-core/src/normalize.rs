//! Normalization: warehouse rows to canonical spend records.
//!
//! Pure and total over well-formed rows. Every cast is exact or fails;
//! nothing is silently truncated. A failed cast aborts the whole batch
//! upstream, before anything is committed.

use crate::canonical::timestamp_from_raw;
use crate::error::NormalizeError;
use crate::raw::{RawNumber, RawRow, RawTimestamp};
use crate::record::CoinbaseSpendRecord;

/// Largest magnitude a double can hold with every integer exactly
/// representable. Beyond this an integral float may already have lost
/// low-order digits, so the cast is not provably exact.
const MAX_EXACT_F64_INT: f64 = 9_007_199_254_740_992.0; // 2^53

/// Convert one raw warehouse row into a canonical record.
pub fn normalize(row: RawRow) -> Result<CoinbaseSpendRecord, NormalizeError> {
    let index = cast_i64("output_index", &row.output_index)?;
    if index < 0 {
        return Err(NormalizeError::NegativeIndex(index));
    }
    let output_index =
        u32::try_from(index).map_err(|_| NormalizeError::OutOfRange {
            field: "output_index",
            value: index.to_string(),
        })?;

    let creation_block_time = match &row.creation_block_time {
        Some(raw) => timestamp_from_raw("creation_block_time", raw)?,
        None => {
            return Err(NormalizeError::MissingCreationTime(format!(
                "{}:{}",
                row.coinbase_txid, output_index
            )))
        }
    };

    Ok(CoinbaseSpendRecord {
        value_sats: cast_i64("value_sats", &row.value_sats)?,
        creation_block_height: cast_i64("creation_block_height", &row.creation_block_height)?,
        creation_block_time,
        spend_block_height: row
            .spend_block_height
            .as_ref()
            .map(|n| cast_i64("spend_block_height", n))
            .transpose()?,
        spend_block_time: row
            .spend_block_time
            .as_ref()
            .map(|t| timestamp_from_raw("spend_block_time", t))
            .transpose()?,
        coinbase_txid: row.coinbase_txid,
        output_index,
        spend_txid: row.spend_txid,
    })
}

/// Exact cast of any raw numeric encoding to `i64`.
fn cast_i64(field: &'static str, raw: &RawNumber) -> Result<i64, NormalizeError> {
    match raw {
        RawNumber::Int(v) => Ok(*v),
        RawNumber::Float(f) => cast_float(field, *f),
        RawNumber::Text(s) => {
            let s = s.trim();
            if let Ok(v) = s.parse::<i64>() {
                return Ok(v);
            }
            // Wide numerics can arrive as "5000000000.0" or "5E9".
            match s.parse::<f64>() {
                Ok(f) => cast_float(field, f),
                Err(_) => Err(NormalizeError::BadNumericText {
                    field,
                    value: s.to_string(),
                }),
            }
        }
    }
}

fn cast_float(field: &'static str, f: f64) -> Result<i64, NormalizeError> {
    if !f.is_finite() || f.abs() > MAX_EXACT_F64_INT {
        return Err(NormalizeError::OutOfRange {
            field,
            value: f.to_string(),
        });
    }
    if f.fract() != 0.0 {
        return Err(NormalizeError::NonIntegralNumber { field, value: f });
    }
    Ok(f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_row() -> RawRow {
        RawRow {
            coinbase_txid: "cb00".to_string(),
            output_index: RawNumber::Int(0),
            value_sats: RawNumber::Text("5000000000".to_string()),
            creation_block_height: RawNumber::Int(0),
            creation_block_time: Some(RawTimestamp::EpochSeconds(1231006505.0)),
            spend_txid: None,
            spend_block_height: None,
            spend_block_time: None,
        }
    }

    #[test]
    fn unspent_row_normalizes() {
        let rec = normalize(raw_row()).unwrap();
        assert_eq!(rec.coinbase_txid, "cb00");
        assert_eq!(rec.output_index, 0);
        assert_eq!(rec.value_sats, 5_000_000_000);
        assert_eq!(rec.creation_block_height, 0);
        assert_eq!(rec.creation_block_time, "2009-01-03T18:15:05Z");
        assert!(!rec.is_spent());
    }

    #[test]
    fn spent_row_carries_all_spend_fields() {
        let mut row = raw_row();
        row.spend_txid = Some("f418".to_string());
        row.spend_block_height = Some(RawNumber::Float(170.0));
        row.spend_block_time = Some(RawTimestamp::Text("1.231731025E9".to_string()));

        let rec = normalize(row).unwrap();
        assert_eq!(rec.spend_txid.as_deref(), Some("f418"));
        assert_eq!(rec.spend_block_height, Some(170));
        assert_eq!(rec.spend_block_time.as_deref(), Some("2009-01-12T03:30:25Z"));
    }

    #[test]
    fn mixed_numeric_encodings_cast_exactly() {
        let mut row = raw_row();
        row.output_index = RawNumber::Text(" 1 ".to_string());
        row.value_sats = RawNumber::Float(2_500_000_000.0);
        row.creation_block_height = RawNumber::Text("5E2".to_string());

        let rec = normalize(row).unwrap();
        assert_eq!(rec.output_index, 1);
        assert_eq!(rec.value_sats, 2_500_000_000);
        assert_eq!(rec.creation_block_height, 500);
    }

    #[test]
    fn fractional_float_rejected() {
        let mut row = raw_row();
        row.value_sats = RawNumber::Float(0.5);
        let err = normalize(row).unwrap_err();
        assert!(matches!(err, NormalizeError::NonIntegralNumber { .. }));
    }

    #[test]
    fn inexact_large_float_rejected() {
        let mut row = raw_row();
        row.value_sats = RawNumber::Float(1e18);
        let err = normalize(row).unwrap_err();
        assert!(matches!(err, NormalizeError::OutOfRange { .. }));
    }

    #[test]
    fn numeric_garbage_rejected() {
        let mut row = raw_row();
        row.creation_block_height = RawNumber::Text("tall".to_string());
        let err = normalize(row).unwrap_err();
        assert!(matches!(err, NormalizeError::BadNumericText { .. }));
    }

    #[test]
    fn negative_index_rejected() {
        let mut row = raw_row();
        row.output_index = RawNumber::Int(-1);
        let err = normalize(row).unwrap_err();
        assert!(matches!(err, NormalizeError::NegativeIndex(-1)));
    }

    #[test]
    fn missing_creation_time_rejected() {
        let mut row = raw_row();
        row.creation_block_time = None;
        let err = normalize(row).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingCreationTime(ref k) if k == "cb00:0"));
    }

    #[test]
    fn null_spend_fields_stay_null() {
        let rec = normalize(raw_row()).unwrap();
        assert_eq!(rec.spend_txid, None);
        assert_eq!(rec.spend_block_height, None);
        assert_eq!(rec.spend_block_time, None);
    }
}
