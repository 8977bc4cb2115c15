//! End-to-end Scenario Tests
//!
//! Drives raw payloads through the public engine API: alias resolution,
//! normalization, aggregation and the rule engine, plus the session reset
//! flow used by the assistant.

use chrono::NaiveDate;
use crop_telemetry::acquisition::{canonicalize, normalizer, FieldResolver};
use crop_telemetry::aggregation::{rolling_mean, DateRange, Projection, SensorSelection};
use crop_telemetry::config::EngineConfig;
use crop_telemetry::context::{Role, SessionStore};
use crop_telemetry::diagnostics::evaluate;
use crop_telemetry::pipeline::{AnalysisRequest, TelemetryEngine};
use crop_telemetry::types::{CropProfile, HealthStatus, SensorKey, SensorRange};
use serde_json::json;
use std::collections::BTreeMap;

fn lettuce_like() -> CropProfile {
    CropProfile::empty("Scenario Crop")
        .with_range(SensorKey::Humidity, SensorRange::new(60.0, 80.0))
        .with_range(SensorKey::Temperature, SensorRange::new(15.0, 24.0))
        .with_range(SensorKey::SoilPh, SensorRange::new(6.0, 7.0))
}

// ============================================================================
// Scenario A: fractional humidity under an alias
// ============================================================================

#[test]
fn scenario_a_fractional_humidity_alias_triggers_attention() {
    let raw = json!({
        "device_id": "node-a",
        "observed_at": "2024-05-01T12:00:00Z",
        "h": 0.42,
        "temperature": 22,
        "ph": 6.5,
    });

    let out = canonicalize(&raw, &FieldResolver::default()).unwrap();
    let humidity = out.reading.value(SensorKey::Humidity).unwrap();
    assert!((humidity - 42.0).abs() < 1e-9);

    let means: BTreeMap<_, _> = out.reading.values.clone();
    let result = evaluate(&means, &lettuce_like());

    assert_eq!(result.status, HealthStatus::Attention);
    assert!(result.tips.iter().any(|t| t.to_lowercase().contains("low humidity")));
    assert!(
        !result.tips.iter().any(|t| t.contains("pH")),
        "pH within range must not produce a tip: {:?}",
        result.tips
    );
    assert!(!result.tips.iter().any(|t| t.contains("too high") || t.contains("below ideal")));
}

#[test]
fn firmware_payload_with_reading_container_resolves_every_sensor() {
    let raw = json!({
        "id_dispositivo": "ESP32_SOLO_01",
        "timestamp": 1714564800,
        "leituras": {
            "umidade": 0.42,
            "temperatura_solo": 21.5,
            "ph_solo": 6.4,
            "n_ppm": 30,
            "p_ppm": 12,
            "k_ppm": 90,
        },
    });

    let out = canonicalize(&raw, &FieldResolver::default()).unwrap();
    assert_eq!(out.reading.device_id, "ESP32_SOLO_01");
    assert!((out.reading.value(SensorKey::Humidity).unwrap() - 42.0).abs() < 1e-9);
    assert_eq!(out.reading.value(SensorKey::Temperature), Some(21.5));
    assert_eq!(out.reading.value(SensorKey::SoilPh), Some(6.4));
    assert_eq!(out.reading.value(SensorKey::Nitrogen), Some(30.0));
    assert_eq!(out.reading.value(SensorKey::Phosphorus), Some(12.0));
    assert_eq!(out.reading.value(SensorKey::Potassium), Some(90.0));
    // The firmware has no conductivity sensor
    assert_eq!(out.defects.len(), 1);
}

// ============================================================================
// Scenario B: humidity excess dominates temperature
// ============================================================================

#[test]
fn scenario_b_humidity_excess_is_alert_with_fixed_tip_order() {
    let raw = json!({
        "device_id": "node-b",
        "observed_at": "2024-05-01T12:00:00Z",
        "umidade": 85,
        "temperatura": 30,
    });
    let out = canonicalize(&raw, &FieldResolver::default()).unwrap();
    let result = evaluate(&out.reading.values, &lettuce_like());

    assert_eq!(result.status, HealthStatus::Alert);
    assert_eq!(result.tips.len(), 2);
    let temp_idx = result.tips.iter().position(|t| t.starts_with("Temperature")).unwrap();
    let hum_idx = result.tips.iter().position(|t| t.starts_with("Excess moisture")).unwrap();
    assert!(temp_idx < hum_idx, "temperature tip must precede humidity tip");
}

// ============================================================================
// Scenario C: empty range
// ============================================================================

#[test]
fn scenario_c_empty_range_is_no_data_not_zeros() {
    let engine = TelemetryEngine::new(&EngineConfig::default());
    engine
        .ingest(&json!({ "device_id": "node-c", "timestamp": "2024-03-10 08:00:00", "temp": 20 }))
        .unwrap();

    let may = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let request = AnalysisRequest {
        range: DateRange::between(may, NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()),
        ..AnalysisRequest::default()
    };
    let analysis = engine.analyze("node-c", &request).unwrap();

    assert_eq!(analysis.readings, 0);
    assert_eq!(analysis.rolling, Projection::NoData);
    assert_eq!(analysis.monthly, Projection::NoData);
    assert!(analysis.means.is_empty());
    assert_eq!(analysis.diagnostic.status, HealthStatus::NoData);
    assert!(analysis.diagnostic.tips.is_empty());
}

#[test]
fn scenario_c_nothing_selected_is_distinct_from_no_data() {
    let engine = TelemetryEngine::new(&EngineConfig::default());
    engine
        .ingest(&json!({ "device_id": "node-c", "timestamp": "2024-05-10 08:00:00", "temp": 20 }))
        .unwrap();

    let request = AnalysisRequest {
        selection: SensorSelection::none(),
        ..AnalysisRequest::default()
    };
    let analysis = engine.analyze("node-c", &request).unwrap();
    assert_eq!(analysis.rolling, Projection::NothingSelected);
    // The verdict still reflects the data
    assert_eq!(analysis.diagnostic.status, HealthStatus::Ideal);
}

// ============================================================================
// Scenario D: session resets
// ============================================================================

#[test]
fn scenario_d_reset_three_turns_reset() {
    let sessions = SessionStore::default();

    sessions.reset("chat-42");
    assert_eq!(sessions.turns("chat-42").len(), 0);

    for (i, role) in [Role::User, Role::Assistant, Role::User].into_iter().enumerate() {
        sessions.append("chat-42", role, format!("turn {i}"));
        assert_eq!(sessions.turns("chat-42").len(), i + 1);
    }

    sessions.reset("chat-42");
    assert_eq!(sessions.turns("chat-42").len(), 0);
    sessions.append("chat-42", Role::User, "again");
    assert_eq!(sessions.turns("chat-42").len(), 1);
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn humidity_normalization_rule_holds_across_values() {
    let resolver = FieldResolver::default();
    for v in [0.0, 0.25, 0.5, 0.999, 1.0, 1.01, 12.0, 55.5, 99.9, 100.0] {
        let raw = json!({ "device_id": "p", "observed_at": "2024-05-01T00:00:00Z", "umidade": v });
        let reading = canonicalize(&raw, &resolver).unwrap().reading;
        let got = reading.value(SensorKey::Humidity).unwrap();
        let expected = if v <= 1.0 { v * 100.0 } else { v };
        assert!((got - expected).abs() < 1e-9, "v={v}: got {got}, expected {expected}");
        if got > 1.0 {
            assert_eq!(normalizer::normalize(SensorKey::Humidity, got), got);
        }
    }
}

#[test]
fn rolling_series_matches_input_length_and_starts_at_first_value() {
    let engine = TelemetryEngine::new(&EngineConfig::default());
    for (i, t) in [18.0, 19.0, 23.0, 21.0, 20.0].iter().enumerate() {
        engine
            .ingest(&json!({
                "device_id": "roll",
                "observed_at": format!("2024-05-01T{:02}:00:00Z", 10 + i),
                "temperature": t,
            }))
            .unwrap();
    }

    let readings = engine.store().snapshot("roll");
    let series = rolling_mean(&readings, &[SensorKey::Temperature], 12, 1);
    assert_eq!(series.len(), readings.len());
    assert_eq!(series[0].values[&SensorKey::Temperature], Some(18.0));
}

#[test]
fn max_reduction_is_order_independent() {
    let profile = CropProfile::iceberg_lettuce();
    let forward: BTreeMap<_, _> = [
        (SensorKey::Humidity, 90.0),
        (SensorKey::Temperature, 20.0),
        (SensorKey::SoilPh, 6.5),
    ]
    .into_iter()
    .collect();
    let reversed: BTreeMap<_, _> = forward.iter().rev().map(|(k, v)| (*k, *v)).collect();

    let a = evaluate(&forward, &profile);
    let b = evaluate(&reversed, &profile);
    assert_eq!(a.status, HealthStatus::Alert);
    assert_eq!(a, b);
}

#[test]
fn canonical_reading_round_trips_through_resolver() {
    let resolver = FieldResolver::default();
    let raw = json!({
        "id_dispositivo": "esp32",
        "data": "2024-05-01",
        "hora": "06:30:00",
        "umidade": 0.66,
        "condutividade_elétrica": "1350",
        "nitrogênio": 160,
        "fósforo": { "$numberInt": "70" },
        "potássio": "n/d",
    });

    let first = canonicalize(&raw, &resolver).unwrap().reading;
    let again = canonicalize(&first.to_canonical_json(), &resolver).unwrap().reading;
    assert_eq!(first, again);
    assert_eq!(first.value(SensorKey::Phosphorus), Some(70.0));
    assert_eq!(first.passthrough.get(&SensorKey::Potassium).map(String::as_str), Some("n/d"));
}
