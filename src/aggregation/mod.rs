//! Windowed aggregation over canonical readings
//!
//! The store owns each device's ordered sequence. Projections are pure
//! functions of a snapshot of that sequence and are rebuilt on every call:
//!
//! - rolling mean: trailing window of N readings, for the smoothed chart
//! - calendar mean: month-end buckets, for month-over-month comparison
//! - period means: one mean per key over the whole range, for diagnostics

pub mod calendar;
pub mod rolling;
pub mod store;

pub use calendar::{calendar_mean, period_means, MonthlyBucket};
pub use rolling::{rolling_mean, RollingPoint, DEFAULT_MIN_PERIODS, DEFAULT_ROLLING_WINDOW};
pub use store::ReadingStore;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::types::{Reading, SensorKey, UnknownSensorKey};

// ============================================================================
// Selection parameters
// ============================================================================

/// Inclusive calendar-date range. An open end is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.start.map_or(true, |s| day >= s) && self.end.map_or(true, |e| day <= e)
    }
}

/// Ordered, duplicate-free set of keys to project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSelection(Vec<SensorKey>);

impl SensorSelection {
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn keys(&self) -> &[SensorKey] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<SensorKey> for SensorSelection {
    fn from_iter<I: IntoIterator<Item = SensorKey>>(iter: I) -> Self {
        let mut keys = Vec::new();
        for key in iter {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        Self(keys)
    }
}

impl FromStr for SensorSelection {
    type Err = UnknownSensorKey;

    /// Comma-separated sensor keys; blanks are ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(SensorKey::from_str)
            .collect()
    }
}

// ============================================================================
// Projection result
// ============================================================================

/// Outcome of a projection.
///
/// "Nothing selected" and "no data" are separate states so a caller never
/// renders an empty selection as a dataset of zeros or vice versa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "points", rename_all = "snake_case")]
pub enum Projection<T> {
    NothingSelected,
    NoData,
    Series(Vec<T>),
}

impl<T> Projection<T> {
    pub fn series(&self) -> Option<&[T]> {
        match self {
            Projection::Series(points) => Some(points),
            _ => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Projection::NoData)
    }
}

// ============================================================================
// Aggregator
// ============================================================================

/// Projection settings; the window is fixed per engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowedAggregator {
    window: usize,
    min_periods: usize,
}

impl Default for WindowedAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_ROLLING_WINDOW, DEFAULT_MIN_PERIODS)
    }
}

impl WindowedAggregator {
    pub fn new(window: usize, min_periods: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            min_periods: min_periods.clamp(1, window),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn rolling(
        &self,
        readings: &[Reading],
        selection: &SensorSelection,
    ) -> Projection<RollingPoint> {
        self.project(readings, selection, |r, keys| {
            rolling_mean(r, keys, self.window, self.min_periods)
        })
    }

    pub fn monthly(
        &self,
        readings: &[Reading],
        selection: &SensorSelection,
    ) -> Projection<MonthlyBucket> {
        self.project(readings, selection, calendar_mean)
    }

    fn project<T>(
        &self,
        readings: &[Reading],
        selection: &SensorSelection,
        build: impl FnOnce(&[Reading], &[SensorKey]) -> Vec<T>,
    ) -> Projection<T> {
        if selection.is_empty() {
            Projection::NothingSelected
        } else if readings.is_empty() {
            Projection::NoData
        } else {
            Projection::Series(build(readings, selection.keys()))
        }
    }
}
