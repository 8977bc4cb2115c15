//! Processing Pipeline Module
//!
//! ```text
//! raw JSON ─► acquisition::canonicalize ─► ReadingStore (per device, ordered)
//!                                             │ snapshot
//!                                             ▼
//!                     WindowedAggregator ─► rolling / monthly / period means
//!                                             │
//!                                             ▼
//!                     diagnostics::evaluate ─► DiagnosticResult + KPIs
//! ```
//!
//! [`TelemetryEngine`] ties the stages together. It is `Sync` and meant to be
//! shared behind an `Arc` by concurrent handlers: ingestion is exclusive per
//! device, analysis works on a consistent snapshot of one device's series.

pub mod cache;
pub mod source;

pub use cache::SnapshotCache;
pub use source::{
    collect_all, JsonLinesSource, ReadingSource, ReplaySource, SourceError, SourceEvent,
};

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::acquisition::{self, AcquisitionError, Canonicalized, FieldResolver};
use crate::aggregation::{
    period_means, DateRange, MonthlyBucket, Projection, ReadingStore, RollingPoint, SensorSelection,
    WindowedAggregator,
};
use crate::config::EngineConfig;
use crate::context::telemetry_summary;
use crate::diagnostics;
use crate::types::{CropProfile, DefectKind, DiagnosticResult, Kpi, Reading, SensorKey};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Unknown crop '{0}'")]
    UnknownCrop(String),
}

/// Tally of a batch ingestion. Malformed entries are counted, never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected: usize,
    pub missing_fields: usize,
    pub coercion_failures: usize,
    /// Lines the source could not parse as JSON at all
    pub skipped_lines: usize,
}

impl IngestReport {
    fn record(&mut self, outcome: &Canonicalized) {
        self.accepted += 1;
        for defect in &outcome.defects {
            match defect.kind {
                DefectKind::MissingField => self.missing_fields += 1,
                DefectKind::CoercionFailure { .. } => self.coercion_failures += 1,
            }
        }
    }
}

/// Selection parameters for one analysis
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub range: DateRange,
    pub selection: SensorSelection,
    /// `None` selects the configured default crop
    pub crop: Option<String>,
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        Self {
            range: DateRange::all(),
            selection: [SensorKey::Temperature, SensorKey::Humidity].into_iter().collect(),
            crop: None,
        }
    }
}

/// Everything the analytics panel renders for one device and range
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub device_id: String,
    pub crop: String,
    pub range: DateRange,
    pub readings: usize,
    pub rolling: Projection<RollingPoint>,
    pub monthly: Projection<MonthlyBucket>,
    pub means: BTreeMap<SensorKey, f64>,
    pub diagnostic: DiagnosticResult,
    pub kpis: Vec<Kpi>,
}

pub struct TelemetryEngine {
    resolver: FieldResolver,
    store: ReadingStore,
    aggregator: WindowedAggregator,
    crops: BTreeMap<String, CropProfile>,
    default_crop: String,
}

impl TelemetryEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            resolver: FieldResolver::new(config.aliases.clone()),
            store: ReadingStore::new(config.aggregation.max_readings_per_device),
            aggregator: WindowedAggregator::new(
                config.aggregation.rolling_window,
                config.aggregation.min_periods,
            ),
            crops: config.crops.clone(),
            default_crop: config.default_crop.clone(),
        }
    }

    pub fn store(&self) -> &ReadingStore {
        &self.store
    }

    /// Named profile, or the default crop when `name` is `None`
    pub fn crop(&self, name: Option<&str>) -> Option<&CropProfile> {
        self.crops.get(name.unwrap_or(&self.default_crop))
    }

    /// Canonicalize one raw payload and store the reading
    pub fn ingest(&self, raw: &Value) -> Result<Canonicalized, AcquisitionError> {
        let outcome = acquisition::canonicalize(raw, &self.resolver)?;

        let failures = outcome.coercion_failures().count();
        if failures > 0 {
            warn!(
                device_id = %outcome.reading.device_id,
                coercion_failures = failures,
                "Non-numeric sensor values passed through"
            );
        }
        debug!(
            device_id = %outcome.reading.device_id,
            observed_at = %outcome.reading.observed_at,
            values = outcome.reading.values.len(),
            defects = outcome.defects.len(),
            "Reading ingested"
        );

        self.store.insert(outcome.reading.clone());
        Ok(outcome)
    }

    /// Ingest a batch. A malformed entry is skipped and counted; the batch
    /// never aborts.
    pub fn ingest_batch<'a>(&self, raws: impl IntoIterator<Item = &'a Value>) -> IngestReport {
        let mut report = IngestReport::default();
        for (index, raw) in raws.into_iter().enumerate() {
            match self.ingest(raw) {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    report.rejected += 1;
                    warn!(index, error = %e, "Rejected raw reading");
                }
            }
        }
        report
    }

    /// Drain a source into the store
    pub async fn ingest_from(
        &self,
        source: &mut dyn ReadingSource,
    ) -> Result<IngestReport, SourceError> {
        let raws = collect_all(source).await?;
        let mut report = self.ingest_batch(&raws);
        report.skipped_lines = source.skipped();
        info!(
            source = source.source_name(),
            accepted = report.accepted,
            rejected = report.rejected,
            skipped = report.skipped_lines,
            "Source ingested"
        );
        Ok(report)
    }

    pub fn latest(&self, device_id: &str) -> Option<Reading> {
        self.store.latest(device_id)
    }

    /// Prompt-ready summary of the device's latest reading
    pub fn telemetry_summary(&self, device_id: &str) -> String {
        telemetry_summary(self.latest(device_id).as_ref())
    }

    /// Rolling and monthly projections, period means, verdict and KPIs for
    /// one device over `request.range`
    pub fn analyze(
        &self,
        device_id: &str,
        request: &AnalysisRequest,
    ) -> Result<Analysis, AnalysisError> {
        let crop_name = request.crop.as_deref();
        let profile = self.crop(crop_name).ok_or_else(|| {
            AnalysisError::UnknownCrop(crop_name.unwrap_or(&self.default_crop).to_string())
        })?;

        let readings = self.store.range(device_id, &request.range);
        let means = period_means(&readings);
        let diagnostic = diagnostics::evaluate(&means, profile);
        let kpis = diagnostics::kpis(&means, profile);

        debug!(
            device_id,
            crop = %profile.name,
            readings = readings.len(),
            status = %diagnostic.status,
            "Analysis complete"
        );

        Ok(Analysis {
            device_id: device_id.to_string(),
            crop: profile.name.clone(),
            range: request.range,
            readings: readings.len(),
            rolling: self.aggregator.rolling(&readings, &request.selection),
            monthly: self.aggregator.monthly(&readings, &request.selection),
            means,
            diagnostic,
            kpis,
        })
    }
}
