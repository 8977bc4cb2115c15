//! Per-device ordered reading store
//!
//! Each device owns one time-ascending `Vec<Reading>`. Writers take the
//! DashMap shard lock for their device only, so appends are exclusive per
//! device while other devices proceed in parallel. Readers get a cloned
//! snapshot and never observe a half-inserted entry.

use dashmap::DashMap;
use tracing::debug;

use super::DateRange;
use crate::types::Reading;

/// Default cap on readings retained per device
pub const DEFAULT_MAX_READINGS_PER_DEVICE: usize = 50_000;

#[derive(Debug)]
pub struct ReadingStore {
    readings: DashMap<String, Vec<Reading>>,
    max_per_device: usize,
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_READINGS_PER_DEVICE)
    }
}

impl ReadingStore {
    pub fn new(max_per_device: usize) -> Self {
        Self {
            readings: DashMap::new(),
            max_per_device: max_per_device.max(1),
        }
    }

    /// Insert at the position given by `observed_at`.
    ///
    /// Late arrivals land in order; equal timestamps keep arrival order.
    /// When the device exceeds its cap the oldest readings are dropped.
    pub fn insert(&self, reading: Reading) {
        let mut series = self.readings.entry(reading.device_id.clone()).or_default();

        let pos = series.partition_point(|r| r.observed_at <= reading.observed_at);
        if pos < series.len() {
            debug!(
                device_id = %reading.device_id,
                observed_at = %reading.observed_at,
                position = pos,
                "Out-of-order reading inserted"
            );
        }
        series.insert(pos, reading);

        if series.len() > self.max_per_device {
            let excess = series.len() - self.max_per_device;
            series.drain(..excess);
        }
    }

    /// Consistent copy of one device's full series
    pub fn snapshot(&self, device_id: &str) -> Vec<Reading> {
        self.readings
            .get(device_id)
            .map(|series| series.clone())
            .unwrap_or_default()
    }

    /// Readings whose calendar date falls inside `range`
    pub fn range(&self, device_id: &str, range: &DateRange) -> Vec<Reading> {
        self.readings
            .get(device_id)
            .map(|series| {
                series
                    .iter()
                    .filter(|r| range.contains(&r.observed_at))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn latest(&self, device_id: &str) -> Option<Reading> {
        self.readings
            .get(device_id)
            .and_then(|series| series.last().cloned())
    }

    pub fn len(&self, device_id: &str) -> usize {
        self.readings.get(device_id).map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.readings.iter().all(|entry| entry.value().is_empty())
    }

    /// Known device ids, sorted
    pub fn devices(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.readings.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SensorKey;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn reading(device: &str, hour: u32, temp: f64) -> Reading {
        Reading::new(device, Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap())
            .with_value(SensorKey::Temperature, temp)
    }

    #[test]
    fn test_out_of_order_insert_lands_in_position() {
        let store = ReadingStore::default();
        store.insert(reading("a", 10, 1.0));
        store.insert(reading("a", 12, 3.0));
        store.insert(reading("a", 11, 2.0));

        let temps: Vec<_> = store
            .snapshot("a")
            .iter()
            .map(|r| r.value(SensorKey::Temperature).unwrap())
            .collect();
        assert_eq!(temps, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_equal_timestamps_keep_arrival_order() {
        let store = ReadingStore::default();
        store.insert(reading("a", 10, 1.0));
        store.insert(reading("a", 10, 2.0));
        let snap = store.snapshot("a");
        assert_eq!(snap[1].value(SensorKey::Temperature), Some(2.0));
    }

    #[test]
    fn test_cap_drops_oldest() {
        let store = ReadingStore::new(2);
        for h in 0..4 {
            store.insert(reading("a", h, h as f64));
        }
        let snap = store.snapshot("a");
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].value(SensorKey::Temperature), Some(2.0));
        assert_eq!(store.latest("a").unwrap().value(SensorKey::Temperature), Some(3.0));
    }

    #[test]
    fn test_devices_are_isolated() {
        let store = ReadingStore::default();
        store.insert(reading("a", 1, 1.0));
        store.insert(reading("b", 2, 2.0));
        assert_eq!(store.len("a"), 1);
        assert_eq!(store.devices(), vec!["a".to_string(), "b".to_string()]);
        assert!(store.snapshot("missing").is_empty());
    }

    #[test]
    fn test_range_filters_by_calendar_date() {
        let store = ReadingStore::default();
        store.insert(reading("a", 23, 1.0));
        store.insert(Reading::new("a", Utc.with_ymd_and_hms(2024, 5, 2, 0, 30, 0).unwrap()));

        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let only_first = DateRange::between(day, day);
        assert_eq!(store.range("a", &only_first).len(), 1);
    }
}
