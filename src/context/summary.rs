//! Plain-text telemetry summary for prompt context
//!
//! Every sensor line is always present. Missing values render as
//! [`UNKNOWN_MARKER`], non-numeric passthrough values render verbatim and
//! are flagged, so the block never carries an empty slot.

use std::fmt::Write as _;

use crate::types::{FieldValue, Reading, SensorKey};

pub const UNKNOWN_MARKER: &str = "unknown";

/// Line used when the device has not reported yet
pub const NO_TELEMETRY: &str = "No telemetry available for this device yet.";

pub fn telemetry_summary(latest: Option<&Reading>) -> String {
    let Some(reading) = latest else {
        return NO_TELEMETRY.to_string();
    };

    let mut out = format!(
        "Latest telemetry (device {}, observed {}):\n",
        reading.device_id,
        reading.observed_at.format("%Y-%m-%d %H:%M UTC")
    );
    for key in SensorKey::DIAGNOSTIC_ORDER {
        let _ = writeln!(out, "- {}: {}", key.label(), render(key, &reading.field(key)));
    }
    out.truncate(out.trim_end().len());
    out
}

fn render(key: SensorKey, field: &FieldValue) -> String {
    match field {
        FieldValue::Numeric(v) => format_measurement(key, *v),
        FieldValue::NonNumeric(raw) => format!("{raw} (non-numeric)"),
        FieldValue::Missing => UNKNOWN_MARKER.to_string(),
    }
}

/// `21.5 °C`, `64.0%`, `6.4`
pub fn format_measurement(key: SensorKey, value: f64) -> String {
    match key.unit() {
        "" => format!("{value:.1}"),
        "%" => format!("{value:.1}%"),
        unit => format!("{value:.1} {unit}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_missing_fields_render_unknown() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut reading = Reading::new("esp32-01", at)
            .with_value(SensorKey::Temperature, 21.5)
            .with_value(SensorKey::Humidity, 64.0);
        reading.passthrough.insert(SensorKey::SoilPh, "erro".to_string());

        let text = telemetry_summary(Some(&reading));
        assert!(text.contains("device esp32-01"));
        assert!(text.contains("- Temperature: 21.5 °C"));
        assert!(text.contains("- Humidity: 64.0%"));
        assert!(text.contains("- Soil pH: erro (non-numeric)"));
        assert!(text.contains("- Potassium (K): unknown"));
        assert_eq!(text.lines().count(), 1 + SensorKey::ALL.len());
        assert!(!text.contains(": \n") && !text.ends_with(": "));
    }

    #[test]
    fn test_no_reading() {
        assert_eq!(telemetry_summary(None), NO_TELEMETRY);
    }
}
