//! Sensor data acquisition module
//!
//! Turns loosely-keyed field payloads into canonical readings:
//! envelope (device id, timestamp) → field resolution → unit normalization.
//! Field-level problems are recorded as defects and never abort a reading;
//! envelope problems reject the payload.

pub mod envelope;
pub mod field_resolver;
pub mod normalizer;

pub use field_resolver::{AliasTable, FieldResolver};

use serde_json::Value;
use thiserror::Error;

use crate::types::{DefectKind, FieldDefect, FieldValue, Reading};

/// Payload-level rejection reasons
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("Missing or empty device id")]
    MissingDeviceId,

    #[error("Missing timestamp")]
    MissingTimestamp,

    #[error("Unparseable timestamp: {0}")]
    InvalidTimestamp(String),
}

/// A canonical reading together with the per-field defects found on the way
#[derive(Debug, Clone)]
pub struct Canonicalized {
    pub reading: Reading,
    pub defects: Vec<FieldDefect>,
}

impl Canonicalized {
    pub fn coercion_failures(&self) -> impl Iterator<Item = &FieldDefect> {
        self.defects
            .iter()
            .filter(|d| matches!(d.kind, DefectKind::CoercionFailure { .. }))
    }
}

/// Canonicalize one raw payload.
///
/// Unit normalization runs here and nowhere else.
pub fn canonicalize(
    raw: &Value,
    resolver: &FieldResolver,
) -> Result<Canonicalized, AcquisitionError> {
    let payload = raw.as_object().ok_or(AcquisitionError::NotAnObject)?;
    let device_id = envelope::device_id(payload)?;
    let observed_at = envelope::observed_at(payload)?;

    let mut reading = Reading::new(device_id, observed_at);
    let mut defects = Vec::new();

    for (key, field) in resolver.resolve(payload) {
        match field {
            FieldValue::Numeric(v) => {
                reading.values.insert(key, normalizer::normalize(key, v));
            }
            FieldValue::NonNumeric(raw) => {
                defects.push(FieldDefect {
                    key,
                    kind: DefectKind::CoercionFailure { raw: raw.clone() },
                });
                reading.passthrough.insert(key, raw);
            }
            FieldValue::Missing => defects.push(FieldDefect {
                key,
                kind: DefectKind::MissingField,
            }),
        }
    }

    Ok(Canonicalized { reading, defects })
}
