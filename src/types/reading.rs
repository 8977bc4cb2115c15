//! Canonical reading types

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::SensorKey;

/// Outcome of resolving one canonical sensor key against a raw payload.
///
/// Distinguishes "absent" from "present but unusable" from "usable", so a
/// missing value is never mistaken for a computed zero downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Numeric(f64),
    /// Located but not coercible to a finite number; raw text kept for operators
    NonNumeric(String),
    Missing,
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }
}

/// Why a sensor key did not produce a usable number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DefectKind {
    /// No alias resolved to a non-null value
    MissingField,
    /// A value was found but could not be parsed as a finite number
    CoercionFailure { raw: String },
}

/// Recoverable per-field defect recorded while canonicalizing a raw reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefect {
    pub key: SensorKey,
    #[serde(flatten)]
    pub kind: DefectKind,
}

/// One canonical sensor sample.
///
/// Produced once by the acquisition pipeline (alias resolution + unit
/// normalization) and never mutated afterwards; stores hand out clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub device_id: String,
    pub observed_at: DateTime<Utc>,
    /// Numeric values only. Absent keys are missing, never zero.
    pub values: BTreeMap<SensorKey, f64>,
    /// Values that were located but failed numeric coercion. Excluded from
    /// all arithmetic; kept so operators can still see what the node sent.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub passthrough: BTreeMap<SensorKey, String>,
}

impl Reading {
    pub fn new(device_id: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            device_id: device_id.into(),
            observed_at,
            values: BTreeMap::new(),
            passthrough: BTreeMap::new(),
        }
    }

    /// Builder-style setter used by tests and fixtures
    pub fn with_value(mut self, key: SensorKey, value: f64) -> Self {
        self.values.insert(key, value);
        self
    }

    pub fn value(&self, key: SensorKey) -> Option<f64> {
        self.values.get(&key).copied()
    }

    /// Resolution state of `key` as seen by consumers of this reading
    pub fn field(&self, key: SensorKey) -> FieldValue {
        if let Some(v) = self.values.get(&key) {
            FieldValue::Numeric(*v)
        } else if let Some(raw) = self.passthrough.get(&key) {
            FieldValue::NonNumeric(raw.clone())
        } else {
            FieldValue::Missing
        }
    }

    /// Serialize back to a flat payload using canonical key names.
    ///
    /// Feeding the result through the field resolver yields the same reading.
    pub fn to_canonical_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(
            "device_id".to_string(),
            serde_json::Value::String(self.device_id.clone()),
        );
        map.insert(
            "observed_at".to_string(),
            serde_json::Value::String(self.observed_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
        for key in SensorKey::ALL {
            match self.field(key) {
                FieldValue::Numeric(v) => {
                    map.insert(key.as_str().to_string(), serde_json::json!(v));
                }
                FieldValue::NonNumeric(raw) => {
                    map.insert(key.as_str().to_string(), serde_json::Value::String(raw));
                }
                FieldValue::Missing => {}
            }
        }
        serde_json::Value::Object(map)
    }
}
