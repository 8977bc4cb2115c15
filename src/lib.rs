//! crop-telemetry: Telemetry Normalization & Diagnostic Engine
//!
//! Reconciles heterogeneous field-sensor readings into canonical records,
//! aggregates them over sliding and calendar windows, and classifies the
//! aggregate against a crop profile to produce a health verdict and tips.
//!
//! ## Architecture
//!
//! - **Acquisition**: alias resolution, unit normalization, envelope parsing
//! - **Aggregation**: per-device ordered store, rolling and monthly projections
//! - **Diagnostics**: crop rule engine, remedies, KPI deltas
//! - **Context**: conversation sessions and the prompt telemetry summary
//! - **Assistant**: prompt assembly around an injected generation backend
//! - **Pipeline**: `TelemetryEngine` facade, reading sources, snapshot cache

pub mod acquisition;
pub mod aggregation;
pub mod assistant;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod pipeline;
pub mod types;

// Re-export configuration
pub use config::EngineConfig;

// Re-export commonly used types
pub use types::{
    CropProfile, DiagnosticResult, FieldDefect, FieldValue, HealthStatus, Kpi, Reading, SensorKey,
    SensorRange, Severity,
};

pub use acquisition::{AcquisitionError, AliasTable, FieldResolver};
pub use aggregation::{DateRange, Projection, ReadingStore, SensorSelection, WindowedAggregator};
pub use assistant::{Assistant, ChatContext, ChatReply, GenerationBackend, ReplySource};
pub use context::{Role, SessionStore, Turn};
pub use pipeline::{Analysis, AnalysisError, AnalysisRequest, IngestReport, TelemetryEngine};
