//! Sliding-window smoothing over the reading sequence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Reading, SensorKey};

/// Default window length, in readings
pub const DEFAULT_ROLLING_WINDOW: usize = 12;
/// Default minimum number of present values for a point to exist
pub const DEFAULT_MIN_PERIODS: usize = 1;

/// One smoothed point, aligned with the reading at the same index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingPoint {
    pub observed_at: DateTime<Utc>,
    /// `None` when fewer than `min_periods` values were present in the window
    pub values: BTreeMap<SensorKey, Option<f64>>,
}

/// Trailing simple moving average.
///
/// The window at index `i` covers readings `i + 1 - window ..= i` (clamped at
/// the start). Absent values are skipped rather than counted as zero. The
/// output has exactly one point per input reading.
pub fn rolling_mean(
    readings: &[Reading],
    keys: &[SensorKey],
    window: usize,
    min_periods: usize,
) -> Vec<RollingPoint> {
    let window = window.max(1);
    let min_periods = min_periods.clamp(1, window);

    readings
        .iter()
        .enumerate()
        .map(|(i, reading)| {
            let start = (i + 1).saturating_sub(window);
            let slice = &readings[start..=i];
            let values = keys
                .iter()
                .map(|&key| (key, windowed_mean(slice, key, min_periods)))
                .collect();
            RollingPoint {
                observed_at: reading.observed_at,
                values,
            }
        })
        .collect()
}

fn windowed_mean(slice: &[Reading], key: SensorKey, min_periods: usize) -> Option<f64> {
    let (sum, count) = slice
        .iter()
        .filter_map(|r| r.value(key))
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));

    if count >= min_periods {
        Some(sum / count as f64)
    } else {
        None
    }
}
