use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{ChartError, ChartResult};

/// Epoch values above this are milliseconds, below it seconds
pub const MILLIS_THRESHOLD: f64 = 1e11;

/// One OHLCV bar plus any indicator-derived fields keyed by indicator id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCandle")]
pub struct Candle {
    /// Epoch seconds
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Derived fields: `{id}`, `{id}_upper`, `{id}_profile`, ...
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Wire form of a candle before time normalization
#[derive(Debug, Deserialize)]
struct RawCandle {
    time: Value,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl TryFrom<RawCandle> for Candle {
    type Error = ChartError;

    fn try_from(raw: RawCandle) -> Result<Self, Self::Error> {
        Ok(Candle {
            time: normalize_time(&raw.time)?,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
            fields: raw.fields,
        })
    }
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
            fields: Map::new(),
        }
    }

    /// Attach a derived field, builder style
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Parse a candle from an already decoded JSON object
    pub fn from_value(value: Value) -> ChartResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Numeric derived value; null, NaN and non-numbers count as absent
    pub fn field_f64(&self, name: &str) -> Option<f64> {
        self.fields
            .get(name)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
    }

    /// Boolean flag; numeric 0/1 is accepted as well
    pub fn field_bool(&self, name: &str) -> Option<bool> {
        match self.fields.get(name)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|v| v != 0.0),
            _ => None,
        }
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.get(name).map_or(false, |v| !v.is_null())
    }
}

/// Normalize a wire time value to epoch seconds.
///
/// Numbers above [`MILLIS_THRESHOLD`] are treated as milliseconds. Strings
/// are either numeric or an ISO/RFC 3339 date; date-only strings resolve to
/// midnight UTC.
pub fn normalize_time(raw: &Value) -> ChartResult<i64> {
    match raw {
        Value::Number(n) => {
            let v = n.as_f64().ok_or_else(|| ChartError::time_parse(n))?;
            normalize_epoch(v).ok_or_else(|| ChartError::time_parse(n))
        }
        Value::String(s) => parse_time_str(s),
        other => Err(ChartError::time_parse(other)),
    }
}

fn normalize_epoch(v: f64) -> Option<i64> {
    if !v.is_finite() {
        return None;
    }
    let secs = if v.abs() > MILLIS_THRESHOLD { v / 1000.0 } else { v };
    Some(secs.floor() as i64)
}

fn parse_time_str(s: &str) -> ChartResult<i64> {
    let s = s.trim();
    if let Ok(v) = s.parse::<f64>() {
        return normalize_epoch(v).ok_or_else(|| ChartError::time_parse(s));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.and_utc().timestamp());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| ChartError::time_parse(s))
}

/// Format epoch seconds as `dd/mm/yyyy HH:MM` in a fixed UTC offset
pub fn format_time(time: i64, utc_offset_minutes: i32) -> String {
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix());
    match DateTime::from_timestamp(time, 0) {
        Some(dt) => dt.with_timezone(&offset).format("%d/%m/%Y %H:%M").to_string(),
        None => "--".to_string(),
    }
}
