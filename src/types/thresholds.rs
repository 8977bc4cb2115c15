//! Crop profiles: per-sensor acceptable ranges used as the classification baseline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::SensorKey;

/// Acceptable band for one sensor dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorRange {
    pub min: f64,
    pub max: f64,
    /// Target value used for KPI deltas; not used for classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideal: Option<f64>,
}

impl SensorRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max, ideal: None }
    }

    pub const fn with_ideal(min: f64, max: f64, ideal: f64) -> Self {
        Self { min, max, ideal: Some(ideal) }
    }

    /// Inclusive on both ends
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl std::fmt::Display for SensorRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}-{:.1}", self.min, self.max)
    }
}

/// Static per-crop configuration.
///
/// Loaded once at startup and read-only afterwards. A dimension with no
/// range is simply not evaluated for that crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    /// Filled from the table key when loaded from config
    #[serde(default, skip_serializing)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<SensorRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<SensorRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_ph: Option<SensorRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conductivity: Option<SensorRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nitrogen: Option<SensorRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phosphorus: Option<SensorRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potassium: Option<SensorRange>,
}

// Leafy-greens nutrient reference shared by the built-in profiles
const CONDUCTIVITY_LEAFY: SensorRange = SensorRange::new(1000.0, 1800.0);
const NITROGEN_LEAFY: SensorRange = SensorRange::new(150.0, 200.0);
const PHOSPHORUS_LEAFY: SensorRange = SensorRange::new(60.0, 100.0);
const POTASSIUM_LEAFY: SensorRange = SensorRange::new(150.0, 200.0);

impl CropProfile {
    /// Profile with a name and no ranges
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            temperature: None,
            humidity: None,
            soil_ph: None,
            conductivity: None,
            nitrogen: None,
            phosphorus: None,
            potassium: None,
        }
    }

    pub fn with_range(mut self, key: SensorKey, range: SensorRange) -> Self {
        *self.slot_mut(key) = Some(range);
        self
    }

    pub fn range(&self, key: SensorKey) -> Option<&SensorRange> {
        match key {
            SensorKey::Temperature => self.temperature.as_ref(),
            SensorKey::Humidity => self.humidity.as_ref(),
            SensorKey::SoilPh => self.soil_ph.as_ref(),
            SensorKey::Conductivity => self.conductivity.as_ref(),
            SensorKey::Nitrogen => self.nitrogen.as_ref(),
            SensorKey::Phosphorus => self.phosphorus.as_ref(),
            SensorKey::Potassium => self.potassium.as_ref(),
        }
    }

    fn slot_mut(&mut self, key: SensorKey) -> &mut Option<SensorRange> {
        match key {
            SensorKey::Temperature => &mut self.temperature,
            SensorKey::Humidity => &mut self.humidity,
            SensorKey::SoilPh => &mut self.soil_ph,
            SensorKey::Conductivity => &mut self.conductivity,
            SensorKey::Nitrogen => &mut self.nitrogen,
            SensorKey::Phosphorus => &mut self.phosphorus,
            SensorKey::Potassium => &mut self.potassium,
        }
    }

    /// Configured ranges in diagnostic order
    pub fn ranges(&self) -> impl Iterator<Item = (SensorKey, &SensorRange)> + '_ {
        SensorKey::DIAGNOSTIC_ORDER
            .into_iter()
            .filter_map(move |key| self.range(key).map(|r| (key, r)))
    }

    fn with_leafy_nutrients(self) -> Self {
        self.with_range(SensorKey::Conductivity, CONDUCTIVITY_LEAFY)
            .with_range(SensorKey::Nitrogen, NITROGEN_LEAFY)
            .with_range(SensorKey::Phosphorus, PHOSPHORUS_LEAFY)
            .with_range(SensorKey::Potassium, POTASSIUM_LEAFY)
    }

    /// Sensitive to excess heat; needs constantly moist soil.
    pub fn iceberg_lettuce() -> Self {
        Self {
            description: "Sensitive to excess heat. Needs constantly moist soil.".to_string(),
            ..Self::empty("Iceberg Lettuce")
        }
        .with_range(SensorKey::Temperature, SensorRange::with_ideal(15.0, 24.0, 20.0))
        .with_range(SensorKey::Humidity, SensorRange::with_ideal(60.0, 80.0, 70.0))
        .with_range(SensorKey::SoilPh, SensorRange::new(6.0, 7.0))
        .with_leafy_nutrients()
    }

    /// Fast cycle; waterlogging invites fungal disease.
    pub fn arugula() -> Self {
        Self {
            description: "Fast cycle. Avoid waterlogging to prevent fungal disease.".to_string(),
            ..Self::empty("Arugula")
        }
        .with_range(SensorKey::Temperature, SensorRange::with_ideal(15.0, 22.0, 18.0))
        .with_range(SensorKey::Humidity, SensorRange::with_ideal(50.0, 70.0, 60.0))
        .with_range(SensorKey::SoilPh, SensorRange::new(6.0, 7.0))
        .with_leafy_nutrients()
    }

    /// Heavy nitrogen feeder; tolerant of swings.
    pub fn collard_greens() -> Self {
        Self {
            description: "High nitrogen demand. Tolerant of environmental swings.".to_string(),
            ..Self::empty("Collard Greens")
        }
        .with_range(SensorKey::Temperature, SensorRange::with_ideal(10.0, 28.0, 22.0))
        .with_range(SensorKey::Humidity, SensorRange::with_ideal(60.0, 75.0, 68.0))
        .with_range(SensorKey::SoilPh, SensorRange::new(6.0, 7.5))
        .with_leafy_nutrients()
    }

    /// Built-in profile table keyed by crop name
    pub fn builtin_table() -> BTreeMap<String, CropProfile> {
        [Self::iceberg_lettuce(), Self::arugula(), Self::collard_greens()]
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect()
    }
}
