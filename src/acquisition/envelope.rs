//! Envelope fields: device identity and observation time
//!
//! Unlike sensor fields these are mandatory. A payload without a usable
//! device id or timestamp cannot be placed in a series and is rejected whole.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Value};

use super::AcquisitionError;

const DEVICE_ID_KEYS: &[&str] = &["device_id", "id_dispositivo"];
const TIMESTAMP_KEYS: &[&str] = &["observed_at", "timestamp"];
const DATE_KEY: &str = "data";
const TIME_KEY: &str = "hora";

/// Naive layouts, interpreted as UTC
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Epoch numbers above this are taken as milliseconds
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// Observation times outside `[EARLIEST_YEAR, LATEST_YEAR]` are rejected
const EARLIEST_YEAR: i32 = 1970;
const LATEST_YEAR: i32 = 2100;

pub fn device_id(payload: &Map<String, Value>) -> Result<String, AcquisitionError> {
    let raw = DEVICE_ID_KEYS
        .iter()
        .filter_map(|k| payload.get(*k))
        .find(|v| !v.is_null());

    let id = match raw {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    if id.is_empty() {
        Err(AcquisitionError::MissingDeviceId)
    } else {
        Ok(id)
    }
}

pub fn observed_at(payload: &Map<String, Value>) -> Result<DateTime<Utc>, AcquisitionError> {
    if let Some(value) = TIMESTAMP_KEYS
        .iter()
        .filter_map(|k| payload.get(*k))
        .find(|v| !v.is_null())
    {
        return parse_timestamp(value);
    }

    let parsed = match (payload.get(DATE_KEY), payload.get(TIME_KEY)) {
        (Some(Value::String(date)), Some(Value::String(time))) => parse_split(date, time),
        (Some(Value::String(date)), None) => parse_text(date),
        _ => return Err(AcquisitionError::MissingTimestamp),
    };
    parsed.and_then(plausible)
}

/// Accepts RFC 3339 text, naive text, epoch numbers, and one wrapper level
/// such as `{"$date": ...}`. Times outside the plausible window are invalid.
pub fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, AcquisitionError> {
    parse_value(value).and_then(plausible)
}

fn parse_value(value: &Value) -> Result<DateTime<Utc>, AcquisitionError> {
    match value {
        Value::String(s) => parse_text(s),
        Value::Number(n) => n
            .as_f64()
            .and_then(from_epoch)
            .ok_or_else(|| AcquisitionError::InvalidTimestamp(n.to_string())),
        Value::Object(inner) => match inner.values().next() {
            Some(Value::String(s)) => parse_text(s),
            Some(Value::Number(n)) => n
                .as_f64()
                .and_then(from_epoch)
                .ok_or_else(|| AcquisitionError::InvalidTimestamp(value.to_string())),
            _ => Err(AcquisitionError::InvalidTimestamp(value.to_string())),
        },
        other => Err(AcquisitionError::InvalidTimestamp(other.to_string())),
    }
}

fn parse_text(s: &str) -> Result<DateTime<Utc>, AcquisitionError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Some(naive) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Ok(naive.and_utc());
    }
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(AcquisitionError::InvalidTimestamp(s.to_string()))
}

fn parse_split(date: &str, time: &str) -> Result<DateTime<Utc>, AcquisitionError> {
    let date_part = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date.trim(), fmt).ok());
    let time_part = TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(time.trim(), fmt).ok());

    match (date_part, time_part) {
        (Some(d), Some(t)) => Ok(d.and_time(t).and_utc()),
        _ => Err(AcquisitionError::InvalidTimestamp(format!("{date} {time}"))),
    }
}

fn plausible(at: DateTime<Utc>) -> Result<DateTime<Utc>, AcquisitionError> {
    if (EARLIEST_YEAR..=LATEST_YEAR).contains(&at.year()) {
        Ok(at)
    } else {
        Err(AcquisitionError::InvalidTimestamp(at.to_rfc3339()))
    }
}

fn from_epoch(raw: f64) -> Option<DateTime<Utc>> {
    if !raw.is_finite() {
        return None;
    }
    let millis = if raw.abs() > EPOCH_MILLIS_THRESHOLD {
        raw
    } else {
        raw * 1000.0
    };
    DateTime::from_timestamp_millis(millis.round() as i64)
}
