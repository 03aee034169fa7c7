//! Canonical timestamp encoding.
//!
//! Timestamps are stored as text, and downstream date filters compare
//! that text lexically. The canonical form is therefore fixed-width
//! RFC 3339 UTC at seconds precision (`2009-01-03T18:15:05Z`), which
//! makes lexical order equal chronological order.
//!
//! Block timestamps are whole seconds on-chain. A sub-second input means
//! the source handed us something canonicalization would truncate, and
//! truncation is never silent: it is a [`NormalizeError`].

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::NormalizeError;
use crate::raw::RawTimestamp;

/// Format string for the canonical form.
const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Warehouse textual fallback, e.g. `2009-01-03 18:15:05 UTC`.
const WAREHOUSE_TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f UTC";

/// Render an instant in the canonical form.
pub fn canonical_timestamp(dt: DateTime<Utc>) -> String {
    dt.format(CANONICAL_FORMAT).to_string()
}

/// Canonicalize an epoch-seconds timestamp.
///
/// The value must be finite, whole-second, and in chrono's representable
/// range; anything else is a lossy cast and fails.
pub fn timestamp_from_epoch(field: &'static str, secs: f64) -> Result<String, NormalizeError> {
    if !secs.is_finite() {
        return Err(NormalizeError::BadTimestamp {
            field,
            value: secs.to_string(),
        });
    }
    if secs.fract() != 0.0 {
        return Err(NormalizeError::SubSecondTimestamp {
            field,
            value: secs.to_string(),
        });
    }
    let dt = DateTime::<Utc>::from_timestamp(secs as i64, 0).ok_or_else(|| {
        NormalizeError::BadTimestamp {
            field,
            value: secs.to_string(),
        }
    })?;
    Ok(canonical_timestamp(dt))
}

/// Canonicalize a textual timestamp.
///
/// Accepts RFC 3339, the warehouse's `YYYY-MM-DD HH:MM:SS UTC` form, and
/// epoch-seconds float text (e.g. `1.231469665E9`).
pub fn timestamp_from_text(field: &'static str, text: &str) -> Result<String, NormalizeError> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return reject_subseconds(field, text, dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, WAREHOUSE_TEXT_FORMAT) {
        return reject_subseconds(field, text, naive.and_utc());
    }
    if let Ok(secs) = text.parse::<f64>() {
        return timestamp_from_epoch(field, secs);
    }

    Err(NormalizeError::BadTimestamp {
        field,
        value: text.to_string(),
    })
}

/// Canonicalize either raw timestamp encoding.
pub fn timestamp_from_raw(field: &'static str, raw: &RawTimestamp) -> Result<String, NormalizeError> {
    match raw {
        RawTimestamp::EpochSeconds(secs) => timestamp_from_epoch(field, *secs),
        RawTimestamp::Text(text) => timestamp_from_text(field, text),
    }
}

fn reject_subseconds(
    field: &'static str,
    original: &str,
    dt: DateTime<Utc>,
) -> Result<String, NormalizeError> {
    if dt.timestamp_subsec_nanos() != 0 {
        return Err(NormalizeError::SubSecondTimestamp {
            field,
            value: original.to_string(),
        });
    }
    Ok(canonical_timestamp(dt))
}
