//! Calendar rollups: month-end buckets
//!
//! Buckets run continuously from the first reading's month to the last
//! reading's month. A month with no readings still gets a bucket, with zero
//! samples and no means, so month-over-month charts keep their spacing.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Reading, SensorKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    /// Last calendar day of the month; the bucket's label date
    pub month_end: NaiveDate,
    /// Short display label such as `May/2024`
    pub label: String,
    pub samples: usize,
    pub values: BTreeMap<SensorKey, Option<f64>>,
}

/// Mean of each key per calendar month. Input order does not matter.
pub fn calendar_mean(readings: &[Reading], keys: &[SensorKey]) -> Vec<MonthlyBucket> {
    // Single pass: month start -> (samples, per-key running sum and count)
    let mut months: BTreeMap<NaiveDate, (usize, Vec<(f64, usize)>)> = BTreeMap::new();
    for reading in readings {
        let (samples, sums) = months
            .entry(month_start(reading.observed_at.date_naive()))
            .or_insert_with(|| (0, vec![(0.0, 0); keys.len()]));
        *samples += 1;
        for (slot, &key) in sums.iter_mut().zip(keys) {
            if let Some(v) = reading.value(key) {
                slot.0 += v;
                slot.1 += 1;
            }
        }
    }

    let (Some(&first), Some(&last)) = (months.keys().next(), months.keys().next_back()) else {
        return Vec::new();
    };

    let mut buckets = Vec::new();
    let mut month = first;
    while month <= last {
        let (samples, values) = match months.get(&month) {
            Some((samples, sums)) => (
                *samples,
                keys.iter()
                    .zip(sums)
                    .map(|(&key, &(sum, count))| (key, (count > 0).then(|| sum / count as f64)))
                    .collect(),
            ),
            None => (0, keys.iter().map(|&key| (key, None)).collect()),
        };

        let end = month_end(month);
        buckets.push(MonthlyBucket {
            month_end: end,
            label: end.format("%b/%Y").to_string(),
            samples,
            values,
        });

        match month.checked_add_months(Months::new(1)) {
            Some(next) => month = next,
            None => break,
        }
    }

    buckets
}

/// Mean of every key present anywhere in `readings`; absent keys are omitted
pub fn period_means(readings: &[Reading]) -> BTreeMap<SensorKey, f64> {
    SensorKey::ALL
        .into_iter()
        .filter_map(|key| mean_of(readings.iter().filter_map(|r| r.value(key))).map(|m| (key, m)))
        .collect()
}

fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn month_end(start: NaiveDate) -> NaiveDate {
    start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(start)
}
