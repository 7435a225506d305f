//! Decoding of the backend's feeding preference document.
//!
//! The listener pushes the whole child preference document on every change;
//! only `prefs.lastBottle` matters here:
//!
//! ```json
//! { "prefs": { "lastBottle": { "start": 1767621600, "bottleAmount": 120, "bottleUnits": "ml" } } }
//! ```

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::record::{FeedEntry, Volume, VolumeUnit};
use crate::error::PayloadError;

/// Extract the last bottle from a preference document.
///
/// Returns `Ok(None)` when the document carries no bottle yet.
pub fn parse_prefs_update(doc: &Value) -> Result<Option<FeedEntry>, PayloadError> {
    let Some(bottle) = doc.get("prefs").and_then(|p| p.get("lastBottle")) else {
        tracing::debug!("no last bottle found in update");
        return Ok(None);
    };
    if bottle.is_null() {
        return Ok(None);
    }
    let Some(start) = bottle.get("start") else {
        return Ok(None);
    };

    let start = start
        .as_f64()
        .ok_or(PayloadError::WrongType { field: "start" })?;
    let timestamp = epoch_to_utc(start)?;

    let amount = match bottle.get("bottleAmount") {
        None | Some(Value::Null) => 0,
        Some(Value::Number(n)) => amount_from_f64(n.as_f64().unwrap_or(-1.0))?,
        Some(Value::String(s)) => {
            let parsed = s
                .trim()
                .parse::<f64>()
                .map_err(|_| PayloadError::InvalidAmount(s.clone()))?;
            amount_from_f64(parsed)?
        }
        Some(_) => return Err(PayloadError::WrongType { field: "bottleAmount" }),
    };

    let unit = match bottle.get("bottleUnits") {
        None | Some(Value::Null) => VolumeUnit::Ml,
        Some(Value::String(s)) => s.parse()?,
        Some(_) => return Err(PayloadError::WrongType { field: "bottleUnits" }),
    };

    Ok(Some(FeedEntry {
        timestamp,
        volume: Volume { amount, unit },
    }))
}

impl FeedEntry {
    /// Encode as the preference document shape the backend pushes.
    pub fn to_prefs_update(&self) -> Value {
        json!({
            "prefs": {
                "lastBottle": {
                    "start": self.timestamp.timestamp(),
                    "bottleAmount": self.volume.amount,
                    "bottleUnits": self.volume.unit.as_str(),
                }
            }
        })
    }
}

fn epoch_to_utc(secs: f64) -> Result<DateTime<Utc>, PayloadError> {
    if !secs.is_finite() {
        return Err(PayloadError::TimestampOutOfRange(secs));
    }
    let whole = secs.trunc() as i64;
    let nanos = ((secs - secs.trunc()) * 1e9).round() as u32;
    DateTime::from_timestamp(whole, nanos.min(999_999_999))
        .ok_or(PayloadError::TimestampOutOfRange(secs))
}

fn amount_from_f64(value: f64) -> Result<u32, PayloadError> {
    if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 {
        return Err(PayloadError::InvalidAmount(value.to_string()));
    }
    Ok(value.trunc() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_full_bottle() {
        let doc = json!({
            "prefs": { "lastBottle": { "start": 1767621600, "bottleAmount": 120, "bottleUnits": "ml" } }
        });
        let entry = parse_prefs_update(&doc).unwrap().unwrap();
        assert_eq!(entry.timestamp, Utc.with_ymd_and_hms(2026, 1, 5, 14, 0, 0).unwrap());
        assert_eq!(entry.volume, Volume::ml(120));
    }

    #[test]
    fn fractional_start_and_string_amount() {
        let doc = json!({
            "prefs": { "lastBottle": { "start": 1767621600.5, "bottleAmount": "90.7", "bottleUnits": "oz" } }
        });
        let entry = parse_prefs_update(&doc).unwrap().unwrap();
        assert_eq!(entry.timestamp.timestamp_subsec_millis(), 500);
        assert_eq!(entry.volume, Volume::oz(90));
    }

    #[test]
    fn missing_units_default_to_ml() {
        let doc = json!({ "prefs": { "lastBottle": { "start": 1767621600, "bottleAmount": 60 } } });
        let entry = parse_prefs_update(&doc).unwrap().unwrap();
        assert_eq!(entry.volume.unit, VolumeUnit::Ml);
    }

    #[test]
    fn document_without_bottle_is_not_an_error() {
        assert_eq!(parse_prefs_update(&json!({ "prefs": {} })).unwrap(), None);
        assert_eq!(parse_prefs_update(&json!({})).unwrap(), None);
        assert_eq!(
            parse_prefs_update(&json!({ "prefs": { "lastBottle": {} } })).unwrap(),
            None
        );
    }

    #[test]
    fn malformed_fields_are_reported() {
        let bad_start = json!({ "prefs": { "lastBottle": { "start": "noon" } } });
        assert_eq!(
            parse_prefs_update(&bad_start),
            Err(PayloadError::WrongType { field: "start" })
        );
        let bad_amount = json!({ "prefs": { "lastBottle": { "start": 1, "bottleAmount": -5 } } });
        assert!(matches!(
            parse_prefs_update(&bad_amount),
            Err(PayloadError::InvalidAmount(_))
        ));
    }

    #[test]
    fn encoded_entry_decodes_back() {
        let entry = FeedEntry {
            timestamp: Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap(),
            volume: Volume::ml(90),
        };
        assert_eq!(parse_prefs_update(&entry.to_prefs_update()).unwrap(), Some(entry));
    }
}
