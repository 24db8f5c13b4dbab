//! Integration tests for MonitorContext
//!
//! These tests drive the public API end to end:
//! - Session lifecycle and concurrent restarts
//! - Incident logging, ordering and amendment
//! - Keyword catalogue round trips
//! - Transcription degradation and model hot-swap
//! - WAV clips decoded from disk

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fall_monitor::analysis::classifier::ClassifierPath;
use fall_monitor::analysis::features::{column_names, FEATURE_COUNT};
use fall_monitor::audio::WavDecoder;
use fall_monitor::error::{DetectionError, DetectionErrorCodes, ModelError};
use fall_monitor::model::{ModelArtifact, ModelKind, Scaler};
use fall_monitor::telemetry::MonitorEvent;
use fall_monitor::transcription::{StaticTranscriber, Transcriber};
use fall_monitor::{AudioClip, MonitorConfig, MonitorContext, Sensitivity, SessionState};

struct SlowTranscriber;

impl Transcriber for SlowTranscriber {
    fn transcribe(&self, _: &[f32], _: u32) -> Result<String, DetectionError> {
        thread::sleep(Duration::from_millis(500));
        Ok("help".to_string())
    }
}

fn silence() -> Vec<u8> {
    vec![0u8; 6400]
}

fn context_hearing(text: &str) -> MonitorContext {
    MonitorContext::with_collaborators(
        MonitorConfig::default(),
        Arc::new(StaticTranscriber::new(text)),
        Arc::new(WavDecoder),
    )
}

fn constant_model(intercept: f32, version: &str) -> ModelArtifact {
    ModelArtifact {
        model_type: "fall_detection".to_string(),
        version: version.to_string(),
        trained_at: None,
        feature_columns: column_names(),
        scaler: Scaler::identity(),
        model: ModelKind::Logistic {
            weights: vec![0.0; FEATURE_COUNT],
            intercept,
        },
    }
}

fn write_tone_wav(path: &std::path::Path, sample_rate: u32, seconds: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let n = (sample_rate as f32 * seconds) as usize;
    for i in 0..n {
        let t = i as f32 / sample_rate as f32;
        let sample = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
        writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn test_sensitivity_table_applied_on_start() {
    let context = MonitorContext::default();

    for (tier, fall, confidence) in [
        (Sensitivity::High, 0.5, 0.4),
        (Sensitivity::Medium, 0.7, 0.6),
        (Sensitivity::Low, 0.8, 0.7),
    ] {
        let snapshot = context.start_monitoring("resident-1", tier).unwrap();
        assert_eq!(snapshot.state, SessionState::Active);
        assert_eq!(snapshot.fall_threshold, Some(fall));
        assert_eq!(snapshot.confidence_threshold, Some(confidence));
    }
}

#[test]
fn test_concurrent_starts_never_merge_thresholds() {
    for _ in 0..20 {
        let context = Arc::new(MonitorContext::default());

        let handles: Vec<_> = [Sensitivity::Low, Sensitivity::High]
            .into_iter()
            .map(|tier| {
                let context = Arc::clone(&context);
                thread::spawn(move || context.start_monitoring("resident-1", tier).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let status = context.get_session_status("resident-1").unwrap();
        let sensitivity = status.sensitivity.unwrap();
        let expected = sensitivity.thresholds();
        assert_eq!(status.fall_threshold, Some(expected.fall_threshold));
        assert_eq!(status.confidence_threshold, Some(expected.confidence_threshold));
        assert_eq!(context.get_aggregate_stats().unwrap().active_sessions, 1);
    }
}

#[test]
fn test_stop_unknown_subject_is_noop() {
    let context = MonitorContext::default();
    assert!(!context.stop_monitoring("nobody").unwrap());

    let status = context.get_session_status("nobody").unwrap();
    assert_eq!(status.state, SessionState::NotMonitoring);
    assert_eq!(status.fall_count, 0);
    assert!(context.telemetry_snapshot().recent.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_incident_history_order_and_limit() {
    let context = context_hearing("please help me");
    context
        .start_monitoring("resident-1", Sensitivity::Medium)
        .unwrap();

    let batch: Vec<(String, Vec<u8>)> = (0..5)
        .map(|_| ("resident-1".to_string(), silence()))
        .collect();
    let results = context.process_clips(batch).await;

    let ids: Vec<u64> = results.iter().map(|r| r.incident_id.unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "lane order broken: {ids:?}");

    let history = context.get_incident_history("resident-1", 3).unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    assert_eq!(history[0].id, *ids.last().unwrap());

    assert_eq!(context.get_incident_history("resident-1", 0).unwrap().len(), 0);
    assert_eq!(context.get_session_status("resident-1").unwrap().fall_count, 5);
    assert_eq!(context.get_aggregate_stats().unwrap().total_falls, 5);
}

#[tokio::test]
async fn test_restart_keeps_fall_count_and_stop_blocks_logging() {
    let context = context_hearing("help");
    context
        .start_monitoring("resident-1", Sensitivity::High)
        .unwrap();
    assert!(context.process_clip("resident-1", silence()).await.incident_id.is_some());

    context.stop_monitoring("resident-1").unwrap();
    let after_stop = context.process_clip("resident-1", silence()).await;
    assert!(after_stop.fall_detected);
    assert!(after_stop.incident_id.is_none());

    let snapshot = context
        .start_monitoring("resident-1", Sensitivity::Low)
        .unwrap();
    assert_eq!(snapshot.fall_count, 1);
    assert_eq!(snapshot.sensitivity, Some(Sensitivity::Low));
    assert!(snapshot.end_time.is_none());
}

#[tokio::test]
async fn test_amend_incident_merges_metadata() {
    let context = context_hearing("ouch");
    context
        .start_monitoring("resident-1", Sensitivity::Medium)
        .unwrap();
    let id = context
        .process_clip("resident-1", silence())
        .await
        .incident_id
        .unwrap();

    let mut notes = serde_json::Map::new();
    notes.insert("outcome".to_string(), serde_json::json!("no injury"));
    let amended = context.amend_incident("resident-1", id, notes).unwrap();
    assert_eq!(amended.metadata["outcome"], "no injury");

    assert!(context
        .amend_incident("resident-1", id + 100, serde_json::Map::new())
        .is_err());
}

#[test]
fn test_keyword_add_remove_restores_baseline() {
    let context = MonitorContext::default();
    let baseline = context.list_distress_keywords().unwrap();

    assert!(context.add_keyword("slip").unwrap().inserted);
    assert!(!context.add_keyword("slip").unwrap().inserted);
    assert_eq!(context.list_distress_keywords().unwrap().len(), baseline.len() + 1);

    assert!(context.remove_keyword("slip").unwrap());
    assert!(!context.remove_keyword("slip").unwrap());
    assert_eq!(context.list_distress_keywords().unwrap(), baseline);
}

#[test]
fn test_keyword_detection_report() {
    let context = MonitorContext::default();
    let report = context.test_keyword_detection("she fell down").unwrap();

    assert!(report.detected_keywords.contains(&"fall".to_string()));
    assert_eq!(report.keyword_count, report.detected_keywords.len());

    let stats = context.keyword_statistics().unwrap();
    let expected = report.keyword_count as f32 / stats.total_keywords as f32;
    assert!((report.confidence - expected).abs() < 1e-6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_transcription_timeout_degrades_to_acoustic() {
    let mut config = MonitorConfig::default();
    config.transcription.timeout_ms = 50;
    let context =
        MonitorContext::with_collaborators(config, Arc::new(SlowTranscriber), Arc::new(WavDecoder));

    let result = context.process_clip("resident-1", silence()).await;

    assert!(result.transcript.is_empty());
    assert!(result.keywords.is_empty());
    assert!(!result.fall_detected);

    let degraded = context.telemetry_snapshot().recent.into_iter().any(|event| {
        matches!(
            event,
            MonitorEvent::TranscriptionDegraded { code, .. }
                if code == DetectionErrorCodes::TRANSCRIPTION_TIMEOUT
        )
    });
    assert!(degraded);
}

#[tokio::test]
async fn test_installed_model_drives_decision() {
    let context = MonitorContext::default();
    context
        .start_monitoring("resident-1", Sensitivity::Medium)
        .unwrap();

    context.install_model(constant_model(3.0, "2")).unwrap();
    let confident = context.process_clip("resident-1", silence()).await;
    assert_eq!(confident.classifier_path, ClassifierPath::Model);
    assert!(confident.fall_detected);
    assert!(confident.confidence > 0.9);

    context.install_model(constant_model(-3.0, "3")).unwrap();
    let doubtful = context.process_clip("resident-1", silence()).await;
    assert_eq!(doubtful.classifier_path, ClassifierPath::Model);
    assert!(!doubtful.fall_detected);
    assert_eq!(context.model_info().unwrap().version, "3");
    assert!(context.get_aggregate_stats().unwrap().model_loaded);

    assert!(context.unload_model().unwrap());
    let rules = context.process_clip("resident-1", silence()).await;
    assert_eq!(rules.classifier_path, ClassifierPath::RuleBased);
}

#[test]
fn test_model_loaded_from_artifact_dir_on_startup() {
    let dir = tempfile::tempdir().unwrap();
    let json = serde_json::to_string(&constant_model(1.0, "7")).unwrap();
    std::fs::write(dir.path().join("fall_detection.json"), json).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a model").unwrap();

    let mut config = MonitorConfig::default();
    config.model.artifact_dir = Some(dir.path().to_path_buf());
    let context = MonitorContext::new(config);

    assert_eq!(context.model_info().unwrap().version, "7");
    assert_eq!(context.available_models().unwrap(), vec!["fall_detection"]);

    let err = context.load_model("missing").unwrap_err();
    assert!(matches!(err, ModelError::ArtifactNotFound { .. }));
    assert_eq!(context.model_info().unwrap().version, "7");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_wav_clip_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_tone_wav(&path, 44_100, 1.0);

    let context = MonitorContext::default();
    let bytes = std::fs::read(&path).unwrap();
    let first = context.process_clip("resident-1", bytes.clone()).await;
    let second = context.process_clip("resident-1", bytes).await;

    assert_eq!(first.features, second.features);
    assert!(first.features.rms_energy > 0.0);
    assert!(first.characteristics.pitch_mean > 400.0 && first.characteristics.pitch_mean < 480.0);
    assert!(!first.recommendations.is_empty());
}

#[tokio::test]
async fn test_event_stream_receives_detections() {
    use tokio_stream::StreamExt;

    let context = MonitorContext::default();
    let mut stream = Box::pin(context.event_stream());

    context.process_clip("resident-1", silence()).await;

    let event = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.subject_id(), Some("resident-1"));
    assert!(matches!(event, MonitorEvent::Detection { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bogus_declared_rate_is_analyzed_at_canonical_rate() {
    let context = context_hearing("help");
    context
        .start_monitoring("resident-1", Sensitivity::Medium)
        .unwrap();

    let clip = AudioClip::with_sample_rate(vec![1u8; 3200], 4_294_967_291);
    let result = context.process_clip("resident-1", clip).await;

    assert!(result.features.rms_energy.is_finite());
    assert!(result.fall_detected);
    assert!(result.incident_id.is_some());
}
