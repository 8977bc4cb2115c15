//! Diagnostic verdict types: Severity, HealthStatus, DiagnosticResult, Kpi

use serde::{Deserialize, Serialize};

use super::SensorKey;

/// Ordered health classification. Rules may only raise it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    Ideal = 0,
    Attention = 1,
    Alert = 2,
}

impl Severity {
    /// Raise `self` to at least `floor`. Never lowers.
    pub fn escalate(&mut self, floor: Severity) {
        if floor > *self {
            *self = floor;
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Ideal => write!(f, "Ideal"),
            Severity::Attention => write!(f, "Attention"),
            Severity::Alert => write!(f, "Alert"),
        }
    }
}

/// Final status of an evaluation.
///
/// `NoData` sits outside the severity ordering: it means nothing was
/// evaluated, which is not the same as a healthy crop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum HealthStatus {
    #[serde(rename = "No Data")]
    NoData,
    Ideal,
    Attention,
    Alert,
}

impl HealthStatus {
    pub fn severity(&self) -> Option<Severity> {
        match self {
            HealthStatus::NoData => None,
            HealthStatus::Ideal => Some(Severity::Ideal),
            HealthStatus::Attention => Some(Severity::Attention),
            HealthStatus::Alert => Some(Severity::Alert),
        }
    }
}

impl From<Severity> for HealthStatus {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Ideal => HealthStatus::Ideal,
            Severity::Attention => HealthStatus::Attention,
            Severity::Alert => HealthStatus::Alert,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.severity() {
            Some(s) => std::fmt::Display::fmt(&s, f),
            None => write!(f, "No Data"),
        }
    }
}

/// Verdict plus advisory tips, produced fresh on every evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub status: HealthStatus,
    /// Ordered by dimension: temperature, humidity, pH, then the rest
    pub tips: Vec<String>,
}

impl DiagnosticResult {
    pub fn no_data() -> Self {
        Self {
            status: HealthStatus::NoData,
            tips: Vec::new(),
        }
    }

    pub fn is_no_data(&self) -> bool {
        self.status == HealthStatus::NoData
    }
}

/// Metric card for the analytics panel: period mean against the crop's target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub key: SensorKey,
    pub mean: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ideal: Option<f64>,
    /// `mean - ideal`, when the profile sets an ideal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_from_ideal: Option<f64>,
    /// `None` when the profile has no range for this key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub within_range: Option<bool>,
}
