//! System-wide default constants.
//!
//! Grouped by subsystem. Config structs use these as their `Default`
//! values so a missing file behaves exactly like the built-in setup.

// ============================================================================
// Config discovery
// ============================================================================

/// Environment variable pointing at a TOML config file.
pub const CONFIG_ENV_VAR: &str = "CROP_TELEMETRY_CONFIG";

/// Config file looked up in the working directory when the env var is unset.
pub const LOCAL_CONFIG_FILE: &str = "crop_telemetry.toml";

// ============================================================================
// Crops
// ============================================================================

/// Crop used when a request does not name one.
pub const DEFAULT_CROP: &str = "Iceberg Lettuce";

// ============================================================================
// Aggregation
// ============================================================================

/// Rolling window length (readings).
pub use crate::aggregation::DEFAULT_ROLLING_WINDOW;

/// Minimum present values for a rolling point.
pub use crate::aggregation::DEFAULT_MIN_PERIODS;

/// Readings retained per device before the oldest are dropped.
pub use crate::aggregation::store::DEFAULT_MAX_READINGS_PER_DEVICE;

// ============================================================================
// Sessions
// ============================================================================

pub use crate::context::session::{DEFAULT_IDLE_EXPIRY_SECS, DEFAULT_MAX_TURNS};

// ============================================================================
// Source cache
// ============================================================================

/// Snapshot lifetime for externally fetched readings (seconds).
pub use crate::pipeline::cache::DEFAULT_CACHE_TTL_SECS;

// ============================================================================
// Assistant
// ============================================================================

pub const ASSISTANT_NAME: &str = "Hortbot";

pub const FALLBACK_MESSAGE: &str = "Hortbot is unavailable right now. Please try again.";

pub const DASHBOARD_HINT: &str = "reply only with the dashboard link: http://localhost:8501";

/// Greeting / reset phrases, matched case-insensitively and exactly.
pub const RESET_PHRASES: &[&str] = &[
    "/start", "reset", "reiniciar", "começar", "oi", "ola", "olá", "bom dia", "boa tarde",
    "boa noite", "opa", "hi", "hello", "start",
];

// ============================================================================
// Physical limits
// ============================================================================

pub const HUMIDITY_MIN_PERCENT: f64 = 0.0;
pub const HUMIDITY_MAX_PERCENT: f64 = 100.0;
pub const PH_MIN: f64 = 0.0;
pub const PH_MAX: f64 = 14.0;

/// Air temperature band outside which a crop range is suspicious (°C).
pub const TEMPERATURE_TYPICAL_MIN_C: f64 = -10.0;
pub const TEMPERATURE_TYPICAL_MAX_C: f64 = 60.0;
