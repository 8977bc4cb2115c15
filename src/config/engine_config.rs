//! Engine Configuration - crop table, alias table and tuning as TOML values
//!
//! Every section is `#[serde(default)]` with defaults equal to the built-in
//! values, so an empty file, a partial file and no file at all all work.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::acquisition::AliasTable;
use crate::types::{CropProfile, SensorKey, SensorRange};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$CROP_TELEMETRY_CONFIG` env var
/// 2. `./crop_telemetry.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Crop used when a request names none
    #[serde(default = "default_crop_name")]
    pub default_crop: String,

    #[serde(default)]
    pub aggregation: AggregationConfig,

    #[serde(default)]
    pub sessions: SessionConfig,

    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub source: SourceConfig,

    /// Ordered alias lists per canonical sensor key
    #[serde(default)]
    pub aliases: AliasTable,

    /// Crop profiles keyed by crop name. A `[crops]` table in the file
    /// replaces the built-in table rather than extending it.
    #[serde(default = "CropProfile::builtin_table")]
    pub crops: BTreeMap<String, CropProfile>,
}

fn default_crop_name() -> String {
    defaults::DEFAULT_CROP.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_crop: default_crop_name(),
            aggregation: AggregationConfig::default(),
            sessions: SessionConfig::default(),
            assistant: AssistantConfig::default(),
            source: SourceConfig::default(),
            aliases: AliasTable::default(),
            crops: CropProfile::builtin_table(),
        }
    }
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$CROP_TELEMETRY_CONFIG` environment variable
    /// 2. `./crop_telemetry.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), crops = config.crops.len(), "Loaded config from {}", defaults::CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", defaults::CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./crop_telemetry.toml
        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(crops = config.crops.len(), "Loaded config from ./{}", defaults::LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::LOCAL_CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No config file found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse, name and validate a TOML document.
    ///
    /// Unknown keys only produce warnings; existing configs keep working.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let mut config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.name_crops();
        config.validate()?;

        let (_, warnings) = super::validation::validate_physical_ranges(&config);
        for w in &warnings {
            warn!("{}", w);
        }
        Ok(config)
    }

    /// Crop names come from the table keys
    fn name_crops(&mut self) {
        for (name, profile) in self.crops.iter_mut() {
            profile.name = name.clone();
        }
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Look up a crop, falling back to `default_crop` when `name` is `None`
    pub fn crop(&self, name: Option<&str>) -> Option<&CropProfile> {
        self.crops.get(name.unwrap_or(&self.default_crop))
    }

    /// Validate the whole config for internal consistency.
    ///
    /// Rules:
    /// - At least one crop, and `default_crop` must name one of them
    /// - Every range: finite bounds, min <= max, ideal inside [min, max]
    /// - Physical limits (humidity percent, pH scale)
    /// - Rolling window > 0, min_periods in 1..=window
    /// - Session turn cap > 0
    /// - Every alias list non-empty, no blank aliases or container keys
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.crops.is_empty() {
            errors.push("crops: at least one crop profile is required".to_string());
        } else if !self.crops.contains_key(&self.default_crop) {
            errors.push(format!(
                "default_crop '{}' is not defined in [crops] (known: {})",
                self.default_crop,
                self.crops.keys().cloned().collect::<Vec<_>>().join(", ")
            ));
        }

        for (name, profile) in &self.crops {
            for (key, range) in profile.ranges() {
                Self::check_range(range, &format!("crops.{name}.{key}"), &mut errors);
            }
        }

        let (physical, _) = super::validation::validate_physical_ranges(self);
        errors.extend(physical);

        let agg = &self.aggregation;
        if agg.rolling_window == 0 {
            errors.push("aggregation.rolling_window must be > 0".to_string());
        }
        if agg.min_periods == 0 || agg.min_periods > agg.rolling_window.max(1) {
            errors.push(format!(
                "aggregation.min_periods ({}) must be in 1..={}",
                agg.min_periods, agg.rolling_window
            ));
        }
        if agg.max_readings_per_device == 0 {
            errors.push("aggregation.max_readings_per_device must be > 0".to_string());
        }

        if self.sessions.max_turns == 0 {
            errors.push("sessions.max_turns must be > 0".to_string());
        }

        for key in SensorKey::ALL {
            let aliases = self.aliases.aliases(key);
            if aliases.is_empty() {
                errors.push(format!("aliases.{key}: alias list must not be empty"));
            } else if aliases.iter().any(|a| a.trim().is_empty()) {
                errors.push(format!("aliases.{key}: aliases must not be blank"));
            }
        }
        if self.aliases.containers.iter().any(|c| c.trim().is_empty()) {
            errors.push("aliases.containers: container keys must not be blank".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_range(range: &SensorRange, name: &str, errors: &mut Vec<String>) {
        // NaN/Inf comparisons silently pass, catch them explicitly
        if !range.min.is_finite() || !range.max.is_finite() {
            errors.push(format!(
                "{name}: bounds must be finite (got min={}, max={})",
                range.min, range.max
            ));
            return;
        }
        if range.min > range.max {
            errors.push(format!(
                "{name}: min ({:.2}) must be <= max ({:.2})",
                range.min, range.max
            ));
        }
        if let Some(ideal) = range.ideal {
            if !range.contains(ideal) {
                errors.push(format!("{name}: ideal ({ideal:.2}) must lie within {range}"));
            }
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Sections
// ============================================================================

/// Windowed aggregation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Rolling mean window (readings)
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,

    /// Present values needed before a rolling point exists
    #[serde(default = "default_min_periods")]
    pub min_periods: usize,

    /// Oldest readings beyond this are dropped per device
    #[serde(default = "default_max_readings")]
    pub max_readings_per_device: usize,
}

fn default_rolling_window() -> usize {
    defaults::DEFAULT_ROLLING_WINDOW
}

fn default_min_periods() -> usize {
    defaults::DEFAULT_MIN_PERIODS
}

fn default_max_readings() -> usize {
    defaults::DEFAULT_MAX_READINGS_PER_DEVICE
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            rolling_window: default_rolling_window(),
            min_periods: default_min_periods(),
            max_readings_per_device: default_max_readings(),
        }
    }
}

/// Conversation retention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Sessions idle this long are purged
    #[serde(default = "default_idle_expiry")]
    pub idle_expiry_secs: u64,
}

fn default_max_turns() -> usize {
    defaults::DEFAULT_MAX_TURNS
}

fn default_idle_expiry() -> u64 {
    defaults::DEFAULT_IDLE_EXPIRY_SECS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            idle_expiry_secs: default_idle_expiry(),
        }
    }
}

/// Assistant identity and canned texts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_name")]
    pub name: String,

    /// Exact-match (case-insensitive) phrases that reset the conversation
    #[serde(default = "default_reset_phrases")]
    pub reset_phrases: Vec<String>,

    /// Returned when the generation backend is missing or fails
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,

    /// Guideline for menu option 3
    #[serde(default = "default_dashboard_hint")]
    pub dashboard_hint: String,
}

fn default_assistant_name() -> String {
    defaults::ASSISTANT_NAME.to_string()
}

fn default_reset_phrases() -> Vec<String> {
    defaults::RESET_PHRASES.iter().map(|s| s.to_string()).collect()
}

fn default_fallback_message() -> String {
    defaults::FALLBACK_MESSAGE.to_string()
}

fn default_dashboard_hint() -> String {
    defaults::DASHBOARD_HINT.to_string()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: default_assistant_name(),
            reset_phrases: default_reset_phrases(),
            fallback_message: default_fallback_message(),
            dashboard_hint: default_dashboard_hint(),
        }
    }
}

/// External reading source settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Snapshot cache lifetime (seconds)
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_cache_ttl() -> u64 {
    defaults::DEFAULT_CACHE_TTL_SECS
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}
