//! Engine Integration Tests
//!
//! Shared-engine behaviour under concurrent ingestion, out-of-order arrival,
//! JSON-lines sources backed by real files, and the assistant wired to a
//! session store that many chats hit at once.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use crop_telemetry::aggregation::{DateRange, Projection, SensorSelection};
use crop_telemetry::assistant::{Assistant, ChatContext, GenerationBackend, ReplySource};
use crop_telemetry::config::EngineConfig;
use crop_telemetry::context::{Role, SessionStore, Turn};
use crop_telemetry::pipeline::{
    AnalysisRequest, JsonLinesSource, ReplaySource, SnapshotCache, TelemetryEngine,
};
use crop_telemetry::types::{CropProfile, HealthStatus, SensorKey};
use serde_json::json;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn payload(device: &str, minutes: i64, temperature: f64, humidity: f64) -> serde_json::Value {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes);
    json!({
        "device_id": device,
        "observed_at": at.to_rfc3339(),
        "temperatura": temperature,
        "umidade": humidity,
    })
}

// ============================================================================
// Concurrent ingestion
// ============================================================================

#[tokio::test]
async fn concurrent_devices_keep_independent_ordered_series() {
    let engine = Arc::new(TelemetryEngine::new(&EngineConfig::default()));

    let mut handles = Vec::new();
    for d in 0..4 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let device = format!("node-{d}");
            // Reverse order so every insert lands before the existing tail
            for m in (0..50).rev() {
                engine.ingest(&payload(&device, m, 20.0, 0.7)).unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(engine.store().devices().len(), 4);
    for d in 0..4 {
        let series = engine.store().snapshot(&format!("node-{d}"));
        assert_eq!(series.len(), 50);
        assert!(
            series.windows(2).all(|w| w[0].observed_at <= w[1].observed_at),
            "series for node-{d} must be time ordered"
        );
    }
}

#[tokio::test]
async fn analysis_during_ingestion_sees_consistent_snapshot() {
    let engine = Arc::new(TelemetryEngine::new(&EngineConfig::default()));
    let writer = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            for m in 0..200 {
                engine.ingest(&payload("shared", m, 21.0, 65.0)).unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    for _ in 0..20 {
        let analysis = engine.analyze("shared", &AnalysisRequest::default()).unwrap();
        if let Projection::Series(points) = &analysis.rolling {
            assert_eq!(points.len(), analysis.readings);
        }
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();

    let done = engine.analyze("shared", &AnalysisRequest::default()).unwrap();
    assert_eq!(done.readings, 200);
    assert_eq!(done.diagnostic.status, HealthStatus::Ideal);
}

// ============================================================================
// JSON-lines sources
// ============================================================================

#[tokio::test]
async fn jsonl_file_ingests_and_counts_bad_lines() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{}", payload("esp32", 0, 19.0, 0.55)).unwrap();
    writeln!(file).unwrap();
    writeln!(file, "{{not json").unwrap();
    writeln!(file, "{}", json!({ "observed_at": "2024-05-01T00:00:00Z", "h": 50 })).unwrap();
    writeln!(file, "{}", payload("esp32", 30, 20.0, 0.60)).unwrap();

    let engine = TelemetryEngine::new(&EngineConfig::default());
    let mut source = JsonLinesSource::open(file.path()).await.unwrap();
    let report = engine.ingest_from(&mut source).await.unwrap();

    assert_eq!(report.accepted, 2);
    assert_eq!(report.rejected, 1, "payload without device id");
    assert_eq!(report.skipped_lines, 1, "unparseable line");
    // Each accepted reading lacks soil pH and the four nutrients
    assert_eq!(report.missing_fields, 10);

    let latest = engine.latest("esp32").unwrap();
    assert_eq!(latest.value(SensorKey::Humidity), Some(60.0));
    let summary = engine.telemetry_summary("esp32");
    assert!(summary.contains("Humidity: 60.0%"), "{summary}");
}

#[tokio::test]
async fn missing_input_file_is_an_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = JsonLinesSource::open(dir.path().join("nope.jsonl")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn date_range_filters_across_months() {
    let engine = TelemetryEngine::new(&EngineConfig::default());
    for (day, month) in [(5, 3), (20, 4), (2, 5), (28, 5)] {
        engine
            .ingest(&json!({
                "device_id": "field",
                "data": format!("{day:02}/{month:02}/2024"),
                "hora": "12:00",
                "temperature": 18.0,
            }))
            .unwrap();
    }

    let request = AnalysisRequest {
        range: DateRange::between(
            chrono::NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        ),
        selection: "temperature".parse::<SensorSelection>().unwrap(),
        crop: Some("Arugula".to_string()),
    };
    let analysis = engine.analyze("field", &request).unwrap();
    assert_eq!(analysis.readings, 3);
    assert_eq!(analysis.crop, "Arugula");
    let months = analysis.monthly.series().unwrap();
    assert_eq!(months.len(), 2);
    assert_eq!(months[0].samples, 1);
    assert_eq!(months[1].samples, 2);
}

#[tokio::test]
async fn mis_scaled_epoch_is_rejected_and_months_stay_bounded() {
    let engine = TelemetryEngine::new(&EngineConfig::default());
    let mut lines: Vec<serde_json::Value> =
        (0..200).map(|m| payload("esp32", m * 60, 20.0, 0.6)).collect();
    // Epoch sent in microseconds
    lines.push(json!({ "device_id": "esp32", "timestamp": 1714564800000000_i64, "temp": 20 }));

    let mut source = ReplaySource::new(lines);
    let report = engine.ingest_from(&mut source).await.unwrap();
    assert_eq!(report.accepted, 200);
    assert_eq!(report.rejected, 1);

    let analysis = engine.analyze("esp32", &AnalysisRequest::default()).unwrap();
    let months = analysis.monthly.series().unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].samples, 200);
}

// ============================================================================
// Snapshot cache
// ============================================================================

#[tokio::test]
async fn cache_serves_concurrent_readers_from_one_fetch() {
    let cache = Arc::new(SnapshotCache::<Vec<u32>>::from_config(&EngineConfig::default().source));
    assert_eq!(cache.ttl().as_secs(), 60);
    let fetches = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        let fetches = Arc::clone(&fetches);
        handles.push(tokio::spawn(async move {
            cache
                .get_or_refresh(|| async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(vec![1, 2, 3])
                })
                .await
                .unwrap()
        }));
    }
    for h in handles {
        assert_eq!(h.await.unwrap(), vec![1, 2, 3]);
    }
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Assistant over shared sessions
// ============================================================================

struct Echo;

#[async_trait]
impl GenerationBackend for Echo {
    async fn generate(&self, prompt: &str, history: &[Turn]) -> anyhow::Result<String> {
        Ok(format!("**{}** turns, prompt {} bytes", history.len(), prompt.len()))
    }

    fn backend_name(&self) -> &'static str {
        "echo"
    }
}

#[tokio::test]
async fn parallel_chats_do_not_share_history() {
    let config = EngineConfig::default();
    let sessions = Arc::new(SessionStore::from_config(&config.sessions));
    let assistant = Arc::new(Assistant::new(
        config.assistant.clone(),
        Arc::clone(&sessions),
        Some(Arc::new(Echo)),
    ));

    let mut handles = Vec::new();
    for chat in 0..5 {
        let assistant = Arc::clone(&assistant);
        handles.push(tokio::spawn(async move {
            let id = format!("chat-{chat}");
            let crop = CropProfile::iceberg_lettuce();
            let ctx = ChatContext {
                crop: &crop,
                latest: None,
                diagnostic: None,
            };
            for _ in 0..3 {
                let reply = assistant.respond(&id, "How is the soil?", ctx).await;
                assert_eq!(reply.source, ReplySource::Backend);
                assert!(!reply.text.contains("**"));
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(sessions.len(), 5);
    for chat in 0..5 {
        assert_eq!(sessions.turns(&format!("chat-{chat}")).len(), 6);
    }
}

/// Replies with the question it was asked, so a turn pair can be matched
struct Mirror;

#[async_trait]
impl GenerationBackend for Mirror {
    async fn generate(&self, prompt: &str, _history: &[Turn]) -> anyhow::Result<String> {
        tokio::task::yield_now().await;
        let question = prompt.rsplit("QUESTION: ").next().unwrap_or_default();
        Ok(question.trim().to_string())
    }

    fn backend_name(&self) -> &'static str {
        "mirror"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_messages_in_one_chat_keep_question_reply_pairs() {
    let mut config = EngineConfig::default();
    config.sessions.max_turns = 200;
    let sessions = Arc::new(SessionStore::from_config(&config.sessions));
    let assistant = Arc::new(Assistant::new(
        config.assistant.clone(),
        Arc::clone(&sessions),
        Some(Arc::new(Mirror)),
    ));

    let mut handles = Vec::new();
    for sender in 0..6 {
        let assistant = Arc::clone(&assistant);
        handles.push(tokio::spawn(async move {
            let crop = CropProfile::arugula();
            for i in 0..5 {
                let ctx = ChatContext {
                    crop: &crop,
                    latest: None,
                    diagnostic: None,
                };
                let question = format!("sender {sender} question {i}");
                let reply = assistant.respond("group-chat", &question, ctx).await;
                assert_eq!(reply.text, question);
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let turns = sessions.turns("group-chat");
    assert_eq!(turns.len(), 60);
    for pair in turns.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
        assert_eq!(pair[0].text, pair[1].text, "reply must directly follow its question");
    }
}
