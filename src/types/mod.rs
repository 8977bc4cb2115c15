//! Shared data structures for crop telemetry diagnostics
//!
//! This module defines the core types flowing through the engine:
//! - Stage 1: SensorKey, FieldValue, FieldDefect (field resolution)
//! - Stage 2: Reading (canonical, unit-normalized sample)
//! - Stage 3: CropProfile / SensorRange (classification baseline)
//! - Stage 4: Severity, HealthStatus, DiagnosticResult, Kpi (verdicts)

mod sensor;
mod reading;
mod thresholds;
mod advisory;

pub use sensor::*;
pub use reading::*;
pub use thresholds::*;
pub use advisory::*;
