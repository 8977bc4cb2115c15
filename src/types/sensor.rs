//! Sensor dimensions

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// One of the fixed dimensions a sensor node can report.
///
/// Declaration order is the canonical storage/serialization order. Diagnostic
/// tip order is a separate, fixed sequence (see [`SensorKey::DIAGNOSTIC_ORDER`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKey {
    Humidity,
    SoilPh,
    Temperature,
    Conductivity,
    Nitrogen,
    Phosphorus,
    Potassium,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown sensor key '{0}' (expected one of: humidity, soil_ph, temperature, conductivity, nitrogen, phosphorus, potassium)")]
pub struct UnknownSensorKey(pub String);

impl SensorKey {
    pub const ALL: [SensorKey; 7] = [
        SensorKey::Humidity,
        SensorKey::SoilPh,
        SensorKey::Temperature,
        SensorKey::Conductivity,
        SensorKey::Nitrogen,
        SensorKey::Phosphorus,
        SensorKey::Potassium,
    ];

    /// Order in which the rule engine evaluates dimensions and emits tips:
    /// temperature, humidity, pH, then the remaining configured dimensions.
    pub const DIAGNOSTIC_ORDER: [SensorKey; 7] = [
        SensorKey::Temperature,
        SensorKey::Humidity,
        SensorKey::SoilPh,
        SensorKey::Conductivity,
        SensorKey::Nitrogen,
        SensorKey::Phosphorus,
        SensorKey::Potassium,
    ];

    /// Canonical schema name
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKey::Humidity => "humidity",
            SensorKey::SoilPh => "soil_ph",
            SensorKey::Temperature => "temperature",
            SensorKey::Conductivity => "conductivity",
            SensorKey::Nitrogen => "nitrogen",
            SensorKey::Phosphorus => "phosphorus",
            SensorKey::Potassium => "potassium",
        }
    }

    /// Human-readable label for summaries and tips
    pub fn label(&self) -> &'static str {
        match self {
            SensorKey::Humidity => "Humidity",
            SensorKey::SoilPh => "Soil pH",
            SensorKey::Temperature => "Temperature",
            SensorKey::Conductivity => "Conductivity (EC)",
            SensorKey::Nitrogen => "Nitrogen (N)",
            SensorKey::Phosphorus => "Phosphorus (P)",
            SensorKey::Potassium => "Potassium (K)",
        }
    }

    /// Resolved unit after normalization. pH is dimensionless.
    pub fn unit(&self) -> &'static str {
        match self {
            SensorKey::Humidity => "%",
            SensorKey::SoilPh => "",
            SensorKey::Temperature => "°C",
            SensorKey::Conductivity => "µS/cm",
            SensorKey::Nitrogen | SensorKey::Phosphorus | SensorKey::Potassium => "mg/kg",
        }
    }

    /// Humidity-like keys may arrive as a fraction in [0, 1] instead of a percentage.
    pub fn is_fraction_scaled(&self) -> bool {
        matches!(self, SensorKey::Humidity)
    }
}

impl std::fmt::Display for SensorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKey {
    type Err = UnknownSensorKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        SensorKey::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| UnknownSensorKey(s.to_string()))
    }
}
