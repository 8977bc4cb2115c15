//! Field Resolver
//!
//! Maps a raw payload with unpredictable key names onto the fixed sensor
//! schema. Lookup is driven entirely by [`AliasTable`]: for each canonical
//! key the aliases are tried in order and the first non-null value wins.
//! Adding an alias is a configuration change, never a code change.
//!
//! Nested values get exactly one unwrap step: a mapping such as
//! `{"umidade": {"$numberDouble": "0.42"}}` resolves to its first value.
//! Anything that would need a second step is reported as a coercion
//! failure instead of being guessed at.
//!
//! Devices that group their sensors under a container key, like the
//! firmware's `{"leituras": {"umidade": .., "n_ppm": ..}}`, are looked up
//! one level down. Top-level fields take precedence over container fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::types::{FieldValue, SensorKey};

// ============================================================================
// Alias Table
// ============================================================================

/// Ordered alias lists per canonical sensor key.
///
/// Each list should start with the canonical name so payloads that already
/// use the fixed schema resolve to themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTable {
    #[serde(default = "default_humidity_aliases")]
    pub humidity: Vec<String>,
    #[serde(default = "default_soil_ph_aliases")]
    pub soil_ph: Vec<String>,
    #[serde(default = "default_temperature_aliases")]
    pub temperature: Vec<String>,
    #[serde(default = "default_conductivity_aliases")]
    pub conductivity: Vec<String>,
    #[serde(default = "default_nitrogen_aliases")]
    pub nitrogen: Vec<String>,
    #[serde(default = "default_phosphorus_aliases")]
    pub phosphorus: Vec<String>,
    #[serde(default = "default_potassium_aliases")]
    pub potassium: Vec<String>,
    /// Keys whose object value holds sensor fields, searched after the top level
    #[serde(default = "default_containers")]
    pub containers: Vec<String>,
}

fn owned(aliases: &[&str]) -> Vec<String> {
    aliases.iter().map(|s| (*s).to_string()).collect()
}

fn default_humidity_aliases() -> Vec<String> {
    owned(&["humidity", "h", "umidade"])
}

fn default_soil_ph_aliases() -> Vec<String> {
    owned(&["soil_ph", "ph_solo", "ph"])
}

fn default_temperature_aliases() -> Vec<String> {
    owned(&["temperature", "temperatura", "temperatura_solo", "temp"])
}

fn default_conductivity_aliases() -> Vec<String> {
    owned(&[
        "conductivity",
        "condutividade_elétrica",
        "condutividade_eletrica",
        "condutividade",
        "ec",
    ])
}

fn default_nitrogen_aliases() -> Vec<String> {
    owned(&["nitrogen", "nitrogênio", "nitrogenio", "n_ppm", "n"])
}

fn default_phosphorus_aliases() -> Vec<String> {
    owned(&["phosphorus", "fósforo", "fosforo", "p_ppm", "p"])
}

fn default_potassium_aliases() -> Vec<String> {
    owned(&["potassium", "potássio", "potassio", "k_ppm", "k"])
}

fn default_containers() -> Vec<String> {
    owned(&["leituras", "readings"])
}

impl Default for AliasTable {
    fn default() -> Self {
        Self {
            humidity: default_humidity_aliases(),
            soil_ph: default_soil_ph_aliases(),
            temperature: default_temperature_aliases(),
            conductivity: default_conductivity_aliases(),
            nitrogen: default_nitrogen_aliases(),
            phosphorus: default_phosphorus_aliases(),
            potassium: default_potassium_aliases(),
            containers: default_containers(),
        }
    }
}

impl AliasTable {
    pub fn aliases(&self, key: SensorKey) -> &[String] {
        match key {
            SensorKey::Humidity => &self.humidity,
            SensorKey::SoilPh => &self.soil_ph,
            SensorKey::Temperature => &self.temperature,
            SensorKey::Conductivity => &self.conductivity,
            SensorKey::Nitrogen => &self.nitrogen,
            SensorKey::Phosphorus => &self.phosphorus,
            SensorKey::Potassium => &self.potassium,
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Pure function of a payload plus the static alias table
#[derive(Debug, Clone, Default)]
pub struct FieldResolver {
    aliases: AliasTable,
}

impl FieldResolver {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    /// Resolve every canonical key. Keys with no usable alias map to `Missing`.
    pub fn resolve(&self, payload: &Map<String, Value>) -> BTreeMap<SensorKey, FieldValue> {
        SensorKey::ALL
            .into_iter()
            .map(|key| (key, self.resolve_key(payload, key)))
            .collect()
    }

    /// Resolve a single canonical key against the payload, then against
    /// each configured container mapping in order
    pub fn resolve_key(&self, payload: &Map<String, Value>, key: SensorKey) -> FieldValue {
        let aliases = self.aliases.aliases(key);
        let containers = self
            .aliases
            .containers
            .iter()
            .filter_map(|name| payload.get(name).and_then(Value::as_object));

        let located = std::iter::once(payload).chain(containers).find_map(|scope| {
            aliases
                .iter()
                .filter_map(|alias| scope.get(alias))
                .find(|v| !v.is_null())
        });

        match located {
            Some(value) => coerce(value),
            None => FieldValue::Missing,
        }
    }
}

/// Coerce a located value, unwrapping at most one level of nesting
fn coerce(value: &Value) -> FieldValue {
    match value {
        Value::Object(inner) => match inner.values().next() {
            Some(Value::Null) => FieldValue::Missing,
            Some(nested @ (Value::Object(_) | Value::Array(_))) => {
                FieldValue::NonNumeric(nested.to_string())
            }
            Some(scalar) => coerce_scalar(scalar),
            None => FieldValue::NonNumeric(value.to_string()),
        },
        other => coerce_scalar(other),
    }
}

fn coerce_scalar(value: &Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Missing,
        Value::Number(n) => match n.as_f64() {
            Some(v) if v.is_finite() => FieldValue::Numeric(v),
            _ => FieldValue::NonNumeric(n.to_string()),
        },
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => FieldValue::Numeric(v),
            _ => FieldValue::NonNumeric(s.clone()),
        },
        other => FieldValue::NonNumeric(other.to_string()),
    }
}
