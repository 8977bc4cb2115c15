//! Diagnostic rule engine
//!
//! Compares period means against a crop profile. Each dimension is judged
//! on its own; the verdict is the maximum severity any rule reached.
//! Tips come out in a fixed dimension order (temperature, humidity, pH,
//! then the rest) regardless of which rule escalated the status.
//!
//! Humidity excess is the one rule that jumps straight to `Alert`. Every
//! other out-of-range condition stops at `Attention`.

pub mod remedies;

pub use remedies::{management_guide, remedy, Deviation};

use std::collections::BTreeMap;

use crate::types::{CropProfile, DiagnosticResult, Kpi, SensorKey, SensorRange, Severity};

/// Dimensions surfaced as KPI cards
pub const KPI_KEYS: [SensorKey; 4] = [
    SensorKey::Temperature,
    SensorKey::Humidity,
    SensorKey::SoilPh,
    SensorKey::Conductivity,
];

/// Evaluate aggregate means against `profile`.
///
/// Pure: the same inputs always give the same result. Empty means yield the
/// "No Data" sentinel, never `Ideal`.
pub fn evaluate(means: &BTreeMap<SensorKey, f64>, profile: &CropProfile) -> DiagnosticResult {
    if means.is_empty() {
        return DiagnosticResult::no_data();
    }

    let mut severity = Severity::Ideal;
    let mut tips = Vec::new();

    for (key, range) in profile.ranges() {
        let Some(&mean) = means.get(&key) else {
            continue;
        };
        if let Some((floor, tip)) = judge(key, mean, range) {
            severity.escalate(floor);
            tips.push(tip);
        }
    }

    DiagnosticResult {
        status: severity.into(),
        tips,
    }
}

/// One rule: returns the severity floor and the tip, or `None` when the
/// dimension has nothing to say.
fn judge(key: SensorKey, mean: f64, range: &SensorRange) -> Option<(Severity, String)> {
    let deviation = if mean < range.min {
        Some(Deviation::Low)
    } else if mean > range.max {
        Some(Deviation::High)
    } else {
        None
    };
    let unit = key.unit();

    match (key, deviation) {
        (SensorKey::Temperature, Some(Deviation::Low)) => Some((
            Severity::Attention,
            format!("Temperature below ideal ({mean:.1}{unit}, range {range}{unit})."),
        )),
        (SensorKey::Temperature, Some(Deviation::High)) => Some((
            Severity::Attention,
            format!("Temperature too high ({mean:.1}{unit}): heat stress risk."),
        )),
        (SensorKey::Temperature, None) => Some((
            Severity::Ideal,
            format!("Temperature within ideal range ({mean:.1}{unit})."),
        )),

        (SensorKey::Humidity, Some(Deviation::Low)) => Some((
            Severity::Attention,
            format!("Low humidity ({mean:.1}{unit}): increase irrigation."),
        )),
        (SensorKey::Humidity, Some(Deviation::High)) => Some((
            Severity::Alert,
            format!("Excess moisture ({mean:.1}{unit}): fungal disease risk, reduce irrigation."),
        )),
        (SensorKey::Humidity, None) => Some((Severity::Ideal, "Irrigation adequate.".to_string())),

        (SensorKey::SoilPh, Some(dev)) => Some((
            Severity::Attention,
            format!(
                "Soil pH {mean:.1} outside acceptable range {range}: {}.",
                remedy(key, dev).unwrap_or("correct soil acidity")
            ),
        )),

        (_, Some(dev)) => {
            let mut tip = format!(
                "{} {} ({mean:.1} {unit}, acceptable {range})",
                key.label(),
                dev.as_str()
            );
            if let Some(r) = remedy(key, dev) {
                tip.push_str(": ");
                tip.push_str(r);
            }
            tip.push('.');
            Some((Severity::Attention, tip))
        }

        (_, None) => None,
    }
}

/// Metric cards: mean against the crop's ideal for the KPI dimensions
pub fn kpis(means: &BTreeMap<SensorKey, f64>, profile: &CropProfile) -> Vec<Kpi> {
    KPI_KEYS
        .into_iter()
        .filter_map(|key| {
            let mean = *means.get(&key)?;
            let range = profile.range(key);
            let ideal = range.and_then(|r| r.ideal);
            Some(Kpi {
                key,
                mean,
                ideal,
                delta_from_ideal: ideal.map(|i| mean - i),
                within_range: range.map(|r| r.contains(mean)),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HealthStatus;

    fn means(pairs: &[(SensorKey, f64)]) -> BTreeMap<SensorKey, f64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_empty_means_is_no_data() {
        let result = evaluate(&BTreeMap::new(), &CropProfile::iceberg_lettuce());
        assert_eq!(result.status, HealthStatus::NoData);
        assert!(result.tips.is_empty());
    }

    #[test]
    fn test_low_humidity_is_attention() {
        let m = means(&[
            (SensorKey::Humidity, 42.0),
            (SensorKey::Temperature, 22.0),
            (SensorKey::SoilPh, 6.5),
        ]);
        let result = evaluate(&m, &CropProfile::iceberg_lettuce());
        assert_eq!(result.status, HealthStatus::Attention);
        assert!(result.tips.iter().any(|t| t.contains("Low humidity")));
        assert!(!result.tips.iter().any(|t| t.contains("pH")));
    }

    #[test]
    fn test_humidity_excess_reaches_alert_and_tip_order_is_fixed() {
        let m = means(&[(SensorKey::Humidity, 85.0), (SensorKey::Temperature, 30.0)]);
        let result = evaluate(&m, &CropProfile::iceberg_lettuce());
        assert_eq!(result.status, HealthStatus::Alert);
        assert_eq!(result.tips.len(), 2);
        assert!(result.tips[0].starts_with("Temperature too high"));
        assert!(result.tips[1].starts_with("Excess moisture"));
    }

    #[test]
    fn test_ideal_dimension_never_lowers_alert() {
        let m = means(&[
            (SensorKey::Humidity, 90.0),
            (SensorKey::Temperature, 20.0),
            (SensorKey::SoilPh, 6.5),
            (SensorKey::Nitrogen, 170.0),
        ]);
        let result = evaluate(&m, &CropProfile::arugula());
        assert_eq!(result.status, HealthStatus::Alert);
    }

    #[test]
    fn test_ph_out_of_range_cites_range_and_remedy() {
        let m = means(&[(SensorKey::SoilPh, 5.2)]);
        let result = evaluate(&m, &CropProfile::iceberg_lettuce());
        assert_eq!(result.status, HealthStatus::Attention);
        assert!(result.tips[0].contains("6.0-7.0"));
        assert!(result.tips[0].contains("lime"));
    }

    #[test]
    fn test_nutrient_rules_use_remedies() {
        let m = means(&[(SensorKey::Phosphorus, 40.0), (SensorKey::Conductivity, 2500.0)]);
        let result = evaluate(&m, &CropProfile::collard_greens());
        assert_eq!(result.status, HealthStatus::Attention);
        // conductivity precedes phosphorus in the fixed order
        assert!(result.tips[0].contains("leach"));
        assert!(result.tips[1].contains("bone meal"));
    }

    #[test]
    fn test_dimensions_without_profile_range_are_ignored() {
        let profile = CropProfile::empty("bare");
        let m = means(&[(SensorKey::Humidity, 99.0)]);
        let result = evaluate(&m, &profile);
        assert_eq!(result.status, HealthStatus::Ideal);
        assert!(result.tips.is_empty());
    }

    #[test]
    fn test_evaluate_is_pure() {
        let m = means(&[(SensorKey::Humidity, 85.0), (SensorKey::SoilPh, 8.0)]);
        let profile = CropProfile::iceberg_lettuce();
        assert_eq!(evaluate(&m, &profile), evaluate(&m, &profile));
    }

    #[test]
    fn test_kpi_deltas() {
        let m = means(&[(SensorKey::Temperature, 22.5), (SensorKey::SoilPh, 6.2)]);
        let cards = kpis(&m, &CropProfile::iceberg_lettuce());
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].key, SensorKey::Temperature);
        assert!((cards[0].delta_from_ideal.unwrap() - 2.5).abs() < 1e-9);
        assert_eq!(cards[0].within_range, Some(true));
        assert_eq!(cards[1].ideal, None);
        assert_eq!(cards[1].delta_from_ideal, None);
    }
}
