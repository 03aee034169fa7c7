//! Proptest strategies for raw warehouse scalars.
//!
//! The interesting space is "values with more than one wire encoding":
//! an exactly-representable integer can arrive as a native int, a float,
//! or text, and normalization must cast all of them to the same value.

use proptest::prelude::*;

use coinscan_core::{RawNumber, RawTimestamp};

/// Largest magnitude exactly representable in an f64 (2^53).
pub const MAX_EXACT: i64 = 9_007_199_254_740_992;

/// Integers every encoding can carry exactly.
pub fn exact_i64() -> impl Strategy<Value = i64> {
    -MAX_EXACT..=MAX_EXACT
}

/// All wire encodings of one exact integer.
pub fn encodings_of(value: i64) -> impl Strategy<Value = RawNumber> {
    prop_oneof![
        Just(RawNumber::Int(value)),
        Just(RawNumber::Float(value as f64)),
        Just(RawNumber::Text(value.to_string())),
        Just(RawNumber::Text(format!("{:E}", value as f64))),
    ]
}

/// Whole-second epoch timestamps in a sane range (1970 to ~2100).
pub fn whole_second_epoch() -> impl Strategy<Value = i64> {
    0i64..4_102_444_800
}

/// Both wire encodings of one whole-second timestamp.
pub fn timestamp_encodings_of(secs: i64) -> impl Strategy<Value = RawTimestamp> {
    prop_oneof![
        Just(RawTimestamp::EpochSeconds(secs as f64)),
        Just(RawTimestamp::Text(secs.to_string())),
        Just(RawTimestamp::Text(format!("{:E}", secs as f64))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinscan_core::{
        normalize, timestamp_from_raw, NormalizeError, RawRow,
    };

    fn row_with_value(value: RawNumber) -> RawRow {
        RawRow {
            coinbase_txid: "cb".to_string(),
            output_index: RawNumber::Int(0),
            value_sats: value,
            creation_block_height: RawNumber::Int(0),
            creation_block_time: Some(RawTimestamp::EpochSeconds(1_231_006_505.0)),
            spend_txid: None,
            spend_block_height: None,
            spend_block_time: None,
        }
    }

    proptest! {
        #[test]
        fn every_encoding_casts_to_the_same_value(
            (value, encoding) in exact_i64().prop_flat_map(|v| (Just(v), encodings_of(v)))
        ) {
            let record = normalize(row_with_value(encoding)).unwrap();
            prop_assert_eq!(record.value_sats, value);
        }

        #[test]
        fn every_timestamp_encoding_canonicalizes_identically(
            (secs, encoding) in whole_second_epoch()
                .prop_flat_map(|s| (Just(s), timestamp_encodings_of(s)))
        ) {
            let canonical = timestamp_from_raw("t", &encoding).unwrap();
            let reference =
                timestamp_from_raw("t", &RawTimestamp::EpochSeconds(secs as f64)).unwrap();
            prop_assert_eq!(canonical, reference);
        }

        #[test]
        fn canonical_order_is_chronological(
            a in whole_second_epoch(),
            b in whole_second_epoch(),
        ) {
            let ca = timestamp_from_raw("t", &RawTimestamp::EpochSeconds(a as f64)).unwrap();
            let cb = timestamp_from_raw("t", &RawTimestamp::EpochSeconds(b as f64)).unwrap();
            prop_assert_eq!(a.cmp(&b), ca.cmp(&cb));
        }

        #[test]
        fn fractional_floats_never_normalize(frac in 1u32..1000u32) {
            let value = RawNumber::Float(100.0 + frac as f64 / 1000.0);
            let err = normalize(row_with_value(value)).unwrap_err();
            prop_assert!(
                matches!(err, NormalizeError::NonIntegralNumber { .. }),
                "unexpected error: {:?}",
                err
            );
        }
    }
}
