//! Engine Configuration Module
//!
//! Crop profile table, alias table and tuning values loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `CROP_TELEMETRY_CONFIG` environment variable (path to TOML file)
//! 2. `crop_telemetry.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! The binary calls `config::init()` once at startup and reads it back with
//! `config::get()`. Library components never touch the global; they take
//! the sections they need by value or reference.
//!
//! ```ignore
//! config::init(EngineConfig::load());
//! let engine = TelemetryEngine::new(config::get());
//! ```

mod engine_config;
pub mod defaults;
pub mod validation;

pub use engine_config::*;

use std::sync::OnceLock;

/// Global engine configuration, initialized once at startup.
static ENGINE_CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Initialize the global engine configuration.
///
/// A second call is ignored with a warning.
pub fn init(config: EngineConfig) {
    if ENGINE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get a reference to the global engine configuration.
///
/// Panics if `init()` has not been called; a missing config is a startup bug.
pub fn get() -> &'static EngineConfig {
    ENGINE_CONFIG
        .get()
        .expect("config::get() called before config::init(), this is a startup bug")
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    ENGINE_CONFIG.get().is_some()
}
