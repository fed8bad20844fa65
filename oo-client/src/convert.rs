//! Conversion helpers between Rust values and the shapes OpenObserve stores.
//!
//! OpenObserve keeps timestamps as microseconds since the Unix epoch and
//! stores documents as flat key/value maps, so documents are flattened
//! (`{"a": {"b": 1}}` becomes `{"a.b": 1}`) and datetimes are turned into
//! integers before ingestion. Search results go the other way on request.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{OpenObserveError, Result};

/// A JSON object as sent to or received from the API.
pub type Record = Map<String, Value>;

/// Default separator for flattened keys.
pub const KEY_SEPARATOR: &str = ".";

/// Flattens nested objects into a single level with joined keys.
///
/// Arrays and scalars are leaves. An empty nested object is kept as-is under
/// its key so the field does not disappear.
pub fn flatten(map: &Record, separator: &str) -> Record {
    let mut out = Map::new();
    flatten_into(&mut out, None, map, separator);
    out
}

fn flatten_into(out: &mut Record, prefix: Option<&str>, map: &Record, separator: &str) {
    for (key, value) in map {
        let new_key = match prefix {
            Some(prefix) => format!("{prefix}{separator}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => {
                flatten_into(out, Some(&new_key), inner, separator)
            }
            _ => {
                out.insert(new_key, value.clone());
            }
        }
    }
}

/// Converts a datetime to microseconds since the epoch.
pub fn datetime_to_micros(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_micros()
}

/// Converts microseconds since the epoch to a datetime, `None` if out of range.
pub fn micros_to_datetime(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
}

/// Renders a datetime the way converted search results carry it.
pub fn format_datetime(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Replaces RFC 3339 string values with their microsecond timestamps.
///
/// `chrono::DateTime` serializes to RFC 3339, so this undoes what serde did
/// to datetime fields. Applied on ingestion only through
/// `OpenObserveClient::index_with`.
pub fn datetime_fields_to_micros(record: &mut Record) {
    for value in record.values_mut() {
        let parsed = match value {
            Value::String(s) => DateTime::parse_from_rfc3339(s).ok(),
            _ => None,
        };
        if let Some(parsed) = parsed {
            *value = Value::from(datetime_to_micros(parsed.with_timezone(&Utc)));
        }
    }
}

/// Converts microsecond timestamp fields of a search hit to RFC 3339 strings.
///
/// With `columns` set, exactly those keys are converted. Without, every key
/// containing `time` is. Values that are not integer timestamps are left
/// untouched. Returns the number of converted fields.
pub fn micros_fields_to_datetime(record: &mut Record, columns: Option<&[String]>) -> usize {
    let mut converted = 0;
    for (key, value) in record.iter_mut() {
        let selected = match columns {
            Some(columns) => columns.iter().any(|c| c == key),
            None => key.contains("time"),
        };
        if !selected {
            continue;
        }
        match value.as_i64().and_then(micros_to_datetime) {
            Some(timestamp) => {
                *value = Value::String(format_datetime(timestamp));
                converted += 1;
            }
            None => warn!(field = %key, value = %value, "could not convert timestamp"),
        }
    }
    converted
}

/// One end of a search time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBound {
    /// Microseconds since the epoch, as the API expects.
    Micros(i64),
    DateTime(DateTime<Utc>),
}

impl TimeBound {
    pub fn as_micros(&self) -> i64 {
        match self {
            TimeBound::Micros(micros) => *micros,
            TimeBound::DateTime(timestamp) => datetime_to_micros(*timestamp),
        }
    }
}

impl Default for TimeBound {
    fn default() -> Self {
        TimeBound::Micros(0)
    }
}

impl From<i64> for TimeBound {
    fn from(micros: i64) -> Self {
        TimeBound::Micros(micros)
    }
}

impl From<DateTime<Utc>> for TimeBound {
    fn from(timestamp: DateTime<Utc>) -> Self {
        TimeBound::DateTime(timestamp)
    }
}

/// A document to ingest, built field by field.
///
/// # Examples
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use oo_client::convert::Document;
///
/// let doc = Document::new()
///     .with_field("message", "started")
///     .with_timestamp("_timestamp", Utc.timestamp_opt(1, 0).unwrap());
/// assert_eq!(doc.as_record()["_timestamp"], 1_000_000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document(Record);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field holding any JSON value.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Add a datetime field, stored as microseconds since the epoch.
    pub fn with_timestamp(mut self, key: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        self.0
            .insert(key.into(), Value::from(datetime_to_micros(timestamp)));
        self
    }

    pub fn as_record(&self) -> &Record {
        &self.0
    }

    pub fn into_record(self) -> Record {
        self.0
    }
}

/// Serializes a value that must be a JSON object into a [`Record`].
pub fn to_record<T: Serialize + ?Sized>(value: &T) -> Result<Record> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(OpenObserveError::InvalidInput {
            message: format!("document must be a JSON object, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_flatten_nested() {
        let input = record(json!({
            "a": {"b": 1, "c": {"d": "x"}},
            "e": [1, 2],
            "f": {},
            "g": null
        }));
        let flat = flatten(&input, KEY_SEPARATOR);
        assert_eq!(flat["a.b"], 1);
        assert_eq!(flat["a.c.d"], "x");
        assert_eq!(flat["e"], json!([1, 2]));
        assert_eq!(flat["f"], json!({}));
        assert!(flat["g"].is_null());
        assert_eq!(flat.len(), 5);
    }

    #[test]
    fn test_flatten_custom_separator() {
        let input = record(json!({"body": {"pid": "40227"}}));
        let flat = flatten(&input, "_");
        assert_eq!(flat["body_pid"], "40227");
    }

    #[test]
    fn test_micros_conversion() {
        let timestamp = Utc.with_ymd_and_hms(2023, 1, 20, 11, 13, 45).unwrap();
        assert_eq!(datetime_to_micros(timestamp), 1_674_213_225_000_000);
        assert_eq!(micros_to_datetime(1_674_213_225_000_000), Some(timestamp));
        assert_eq!(micros_to_datetime(i64::MAX), None);
    }

    #[test]
    fn test_auto_conversion_matches_time_keys() {
        let mut hit = record(json!({
            "_timestamp": 1674213225158000i64,
            "_messagetime": 1745154631656901i64,
            "log": "hello",
        }));
        let converted = micros_fields_to_datetime(&mut hit, None);
        assert_eq!(converted, 2);
        assert_eq!(hit["_timestamp"], "2023-01-20T11:13:45.158000Z");
        assert_eq!(hit["log"], "hello");
    }

    #[test]
    fn test_unconvertible_values_are_left_alone() {
        let mut hit = record(json!({
            "body___monotonic_timestamp": "3284525466301",
            "info_utc_time": "2025-04-20T12:34:56.656901530Z",
        }));
        let converted = micros_fields_to_datetime(&mut hit, None);
        assert_eq!(converted, 0);
        assert_eq!(hit["body___monotonic_timestamp"], "3284525466301");
    }

    #[test]
    fn test_explicit_columns_only() {
        let mut hit = record(json!({
            "_timestamp": 1674213225158000i64,
            "created": 1674213225158000i64,
        }));
        let columns = vec!["created".to_string()];
        assert_eq!(micros_fields_to_datetime(&mut hit, Some(&columns)), 1);
        assert!(hit["_timestamp"].is_i64());
        assert!(hit["created"].is_string());
    }

    #[test]
    fn test_datetime_fields_to_micros() {
        let mut doc = record(json!({
            "when": "2023-01-20T11:13:45Z",
            "message": "not a date",
            "count": 3
        }));
        datetime_fields_to_micros(&mut doc);
        assert_eq!(doc["when"], 1_674_213_225_000_000i64);
        assert_eq!(doc["message"], "not a date");
        assert_eq!(doc["count"], 3);
    }

    #[test]
    fn test_time_bound() {
        let timestamp = Utc.timestamp_opt(10, 0).unwrap();
        assert_eq!(TimeBound::from(timestamp).as_micros(), 10_000_000);
        assert_eq!(TimeBound::from(42i64).as_micros(), 42);
        assert_eq!(TimeBound::default().as_micros(), 0);
    }

    #[test]
    fn test_to_record_rejects_non_objects() {
        assert!(to_record(&json!([1, 2])).is_err());
        assert!(to_record(&json!({"a": 1})).is_ok());
    }
}
