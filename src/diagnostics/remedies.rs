//! Canned management advice
//!
//! One remedy per (dimension, direction). The same table feeds the
//! diagnostic tips and the management guide embedded in assistant prompts,
//! so both consumers always give the same advice.

use crate::types::SensorKey;

/// Which side of the acceptable band a mean fell on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deviation {
    Low,
    High,
}

impl Deviation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Deviation::Low => "low",
            Deviation::High => "high",
        }
    }
}

/// Corrective action for a dimension out of range, if one is known
pub fn remedy(key: SensorKey, deviation: Deviation) -> Option<&'static str> {
    use Deviation::*;
    use SensorKey::*;

    match (key, deviation) {
        (SoilPh, Low) => Some("apply agricultural lime (calcium carbonate) to raise pH"),
        (SoilPh, High) => Some("apply elemental sulfur to lower pH"),
        (Nitrogen, Low) => Some("apply urea or well-cured manure"),
        (Phosphorus, Low) => Some("apply bone meal"),
        (Potassium, Low) => Some("apply potassium chloride"),
        (Conductivity, High) => {
            Some("leach the soil with controlled irrigation to flush excess salts")
        }
        (Conductivity, Low) => Some("review the fertilization plan; nutrient availability is low"),
        (Nitrogen | Phosphorus | Potassium, High) => {
            Some("suspend fertilization with this nutrient")
        }
        (Humidity, Low) => Some("increase irrigation"),
        (Humidity, High) => Some("reduce irrigation and improve drainage"),
        (Temperature, _) => None,
    }
}

/// Management guide lines, one per remedy, for prompt context
pub fn management_guide() -> Vec<String> {
    [
        (SensorKey::SoilPh, Deviation::Low),
        (SensorKey::SoilPh, Deviation::High),
        (SensorKey::Nitrogen, Deviation::Low),
        (SensorKey::Phosphorus, Deviation::Low),
        (SensorKey::Potassium, Deviation::Low),
        (SensorKey::Conductivity, Deviation::High),
    ]
    .into_iter()
    .filter_map(|(key, dev)| {
        remedy(key, dev).map(|r| format!("- {} {}: {}", key.label(), dev.as_str(), r))
    })
    .collect()
}
