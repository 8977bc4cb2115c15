//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.
//!
//! Crop names are free-form table keys, so the segment under `crops` is
//! matched as the wildcard `*`.

use std::collections::HashSet;

use super::defaults;
use crate::types::SensorKey;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

/// Table whose direct children are user-chosen names
const DYNAMIC_TABLE: &str = "crops";

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for EngineConfig.
///
/// Sensor sub-keys are generated from [`SensorKey::ALL`]; everything else is
/// maintained by hand to match the structs in engine_config.rs.
pub fn known_config_keys() -> HashSet<String> {
    let fixed: &[&str] = &[
        "default_crop",
        // [aggregation]
        "aggregation",
        "aggregation.rolling_window",
        "aggregation.min_periods",
        "aggregation.max_readings_per_device",
        // [sessions]
        "sessions",
        "sessions.max_turns",
        "sessions.idle_expiry_secs",
        // [assistant]
        "assistant",
        "assistant.name",
        "assistant.reset_phrases",
        "assistant.fallback_message",
        "assistant.dashboard_hint",
        // [source]
        "source",
        "source.cache_ttl_secs",
        // [aliases]
        "aliases",
        "aliases.containers",
        // [crops.<name>]
        "crops",
        "crops.*",
        "crops.*.description",
    ];

    let mut keys: HashSet<String> = fixed.iter().map(|s| s.to_string()).collect();
    for key in SensorKey::ALL {
        keys.insert(format!("aliases.{key}"));
        keys.insert(format!("crops.*.{key}"));
        for bound in ["min", "max", "ideal"] {
            keys.insert(format!("crops.*.{key}.{bound}"));
        }
    }
    keys
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`. Children of the `crops` table appear as `*`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let segment = if prefix == DYNAMIC_TABLE { "*" } else { k.as_str() };
            let path = if prefix.is_empty() {
                segment.to_string()
            } else {
                format!("{prefix}.{segment}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings, by chars.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the lexicographically smallest key so suggestions are
/// stable across runs.
pub fn suggest_correction(unknown: &str, known: &HashSet<String>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.clone())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys; it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Validate physical ranges on a parsed EngineConfig.
///
/// Returns (errors, warnings): errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_physical_ranges(
    config: &super::EngineConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (name, profile) in &config.crops {
        // Humidity is a percentage after normalization
        if let Some(h) = profile.humidity {
            if h.min < defaults::HUMIDITY_MIN_PERCENT || h.max > defaults::HUMIDITY_MAX_PERCENT {
                errors.push(format!(
                    "crops.{name}.humidity = {h} is outside physical range (0-100 %)"
                ));
            }
        }

        if let Some(ph) = profile.soil_ph {
            if ph.min < defaults::PH_MIN || ph.max > defaults::PH_MAX {
                errors.push(format!("crops.{name}.soil_ph = {ph} is outside the pH scale (0-14)"));
            }
        }

        // Concentrations cannot be negative
        for key in [
            SensorKey::Conductivity,
            SensorKey::Nitrogen,
            SensorKey::Phosphorus,
            SensorKey::Potassium,
        ] {
            if let Some(r) = profile.range(key) {
                if r.min < 0.0 {
                    errors.push(format!("crops.{name}.{key}.min = {:.1} cannot be negative", r.min));
                }
            }
        }

        if let Some(t) = profile.temperature {
            if t.min < defaults::TEMPERATURE_TYPICAL_MIN_C
                || t.max > defaults::TEMPERATURE_TYPICAL_MAX_C
            {
                warnings.push(ValidationWarning {
                    field: format!("crops.{name}.temperature"),
                    message: format!(
                        "crops.{name}.temperature = {t} is outside typical growing range (-10-60 °C)"
                    ),
                    suggestion: None,
                });
            }
        }
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
