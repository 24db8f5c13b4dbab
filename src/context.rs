// MonitorContext: Dependency Injection Container
// Owns every piece of process-wide monitor state and exposes the external API

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tokio_stream::Stream;

use crate::analysis::classifier::{FallDecision, Strategy};
use crate::analysis::features::ClipFeatures;
use crate::analysis::{recommendations, AnalysisPipeline, DetectionResult};
use crate::audio::{AudioClip, AudioDecoder, AudioNormalizer, WavDecoder};
use crate::config::MonitorConfig;
use crate::error::{
    log_detection_error, log_keyword_error, log_model_error, log_session_error, DetectionError,
    ErrorCode, KeywordError, ModelError, SessionError,
};
use crate::keywords::{
    AddOutcome, DistressKeywordDetector, KeywordCatalogue, KeywordStatistics, KeywordTestReport,
};
use crate::managers::{subject_key, Admission, AggregateStats, SessionManager};
use crate::model::{ModelArtifact, ModelInfo, ModelRegistry};
use crate::session::{Incident, NewIncident, Sensitivity, SessionSnapshot, SessionState};
use crate::telemetry::{MonitorEvent, TelemetryCollector, TelemetrySnapshot};
use crate::transcription::{NullTranscriber, Transcriber, TranscriptionBridge};

/// MonitorContext: container for all monitor state
///
/// Consolidates what would otherwise be process-wide registries:
/// - Session map, per-subject lanes and incident log (SessionManager)
/// - Active classifier artifact (ModelRegistry)
/// - Distress keyword catalogue
/// - Telemetry history and event broadcast
///
/// Every method takes `&self`; share one context behind an `Arc` and call it
/// from any number of tasks.
pub struct MonitorContext {
    config: MonitorConfig,
    pipeline: Arc<AnalysisPipeline>,
    keywords: DistressKeywordDetector,
    models: ModelRegistry,
    sessions: SessionManager,
    transcription: TranscriptionBridge,
    telemetry: TelemetryCollector,
}

impl MonitorContext {
    /// Create a context with the WAV decoder and no transcription backend
    pub fn new(config: MonitorConfig) -> Self {
        Self::with_collaborators(config, Arc::new(NullTranscriber), Arc::new(WavDecoder))
    }

    /// Create a context with explicit transcription and decode collaborators
    ///
    /// # Arguments
    /// * `config` - Monitor configuration
    /// * `transcriber` - Speech-to-text backend, called under the configured timeout
    /// * `decoder` - Container decoder tried before the raw PCM fallback
    ///
    /// When `config.model.load_on_startup` is set the configured artifact is
    /// loaded immediately; a missing or broken artifact is logged and the
    /// context starts on the rule-based path.
    pub fn with_collaborators(
        config: MonitorConfig,
        transcriber: Arc<dyn Transcriber>,
        decoder: Arc<dyn AudioDecoder>,
    ) -> Self {
        let normalizer = AudioNormalizer::with_decoder(config.audio.clone(), decoder);
        let pipeline = Arc::new(AnalysisPipeline::with_normalizer(&config, normalizer));
        let keywords = DistressKeywordDetector::new(
            Arc::new(KeywordCatalogue::with_defaults()),
            config.keywords.acoustic.clone(),
        );
        let transcription = TranscriptionBridge::new(
            transcriber,
            Duration::from_millis(config.transcription.timeout_ms),
        );
        let telemetry =
            TelemetryCollector::new(config.telemetry.buffer, config.telemetry.history_capacity);

        let context = Self {
            models: ModelRegistry::new(config.model.artifact_dir.clone()),
            config,
            pipeline,
            keywords,
            sessions: SessionManager::new(),
            transcription,
            telemetry,
        };

        if context.config.model.load_on_startup && context.models.artifact_dir().is_some() {
            let model_type = context.config.model.model_type.clone();
            match context.load_model(&model_type) {
                Ok(info) => log::info!(
                    "[MonitorContext] Startup model {} v{} loaded",
                    info.model_type,
                    info.version
                ),
                Err(_) => log::warn!(
                    "[MonitorContext] No startup model; using rule-based classification"
                ),
            }
        }

        context
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    // ========================================================================
    // DETECTION
    // ========================================================================

    /// Run the full detection pipeline on one clip
    ///
    /// # Arguments
    /// * `subject_id` - Subject the clip belongs to (monitored or not);
    ///   surrounding whitespace is ignored
    /// * `clip` - Raw clip bytes
    ///
    /// # Returns
    /// Always a result; every stage absorbs its own failures and degrades.
    ///
    /// Clips for the same subject complete in the order they were submitted.
    /// Session state (thresholds and whether a fall is logged) is captured
    /// when the clip is admitted and is not affected by later start/stop calls.
    pub async fn process_clip(
        &self,
        subject_id: &str,
        clip: impl Into<AudioClip>,
    ) -> DetectionResult {
        let clip = clip.into();
        let started = Instant::now();
        let subject_id = subject_key(subject_id);

        let _turn = self
            .sessions
            .enter_lane(subject_id)
            .await
            .map_err(|err| self.report_session_error(&err, "process_clip::lane"))
            .ok();

        let admission = self.admit(subject_id);
        let strategy = Strategy::select(self.models.active());

        let (samples, sample_rate) = self.normalize(clip).await;
        let samples = Arc::new(samples);

        let extraction = {
            let pipeline = Arc::clone(&self.pipeline);
            let samples = Arc::clone(&samples);
            tokio::task::spawn_blocking(move || pipeline.extract(&samples))
        };
        let (extracted, transcribed) = tokio::join!(
            extraction,
            self.transcription
                .transcribe(Arc::clone(&samples), sample_rate)
        );

        let features = extracted.unwrap_or_else(|join_err| {
            let err = DetectionError::FeatureExtractionFailure {
                reason: format!("extraction task failed: {}", join_err),
            };
            self.report_detection_error(&err, "process_clip::extract");
            ClipFeatures::default()
        });

        let transcript = transcribed.unwrap_or_else(|err| {
            log_detection_error(&err, "process_clip::transcribe");
            self.telemetry.publish(MonitorEvent::TranscriptionDegraded {
                subject_id: subject_id.to_string(),
                code: err.code(),
                reason: err.message(),
            });
            String::new()
        });

        let decision = self.pipeline.classifier().classify(
            &strategy,
            &features.vector,
            &features.characteristics,
            admission.thresholds,
        );
        let keywords = self.keywords.detect(
            Some(transcript.as_str()),
            &features.vector,
            &features.characteristics,
        );

        let fall_detected = self.fuse(&decision, &keywords);
        let timestamp = Utc::now();

        let incident_id = if fall_detected && admission.logging {
            self.log_incident(subject_id, &decision, &features, &keywords, timestamp)
        } else {
            None
        };

        let result = DetectionResult {
            subject_id: subject_id.to_string(),
            fall_detected,
            confidence: decision.confidence,
            features: features.vector,
            characteristics: features.characteristics,
            recommendations: recommendations(fall_detected, &keywords),
            keywords,
            classifier_path: decision.path,
            transcript,
            incident_id,
            timestamp,
        };

        let processing_ms = started.elapsed().as_secs_f32() * 1000.0;
        log::debug!(
            "[MonitorContext] {} processed in {:.1} ms (fall={}, confidence={:.2}, path={:?})",
            subject_id,
            processing_ms,
            result.fall_detected,
            result.confidence,
            result.classifier_path
        );
        self.telemetry.publish(MonitorEvent::Detection {
            subject_id: result.subject_id.clone(),
            fall_detected: result.fall_detected,
            confidence: result.confidence,
            path: result.classifier_path,
            keyword_count: result.keywords.len(),
            processing_ms,
        });

        result
    }

    /// Process a batch of clips concurrently
    ///
    /// Results are returned in batch order. Clips for different subjects run
    /// in parallel; clips for the same subject keep batch order.
    pub async fn process_clips<C>(&self, batch: Vec<(String, C)>) -> Vec<DetectionResult>
    where
        C: Into<AudioClip>,
    {
        let batch: Vec<(String, AudioClip)> = batch
            .into_iter()
            .map(|(subject_id, clip)| (subject_id, clip.into()))
            .collect();

        join_all(
            batch
                .into_iter()
                .map(|(subject_id, clip)| async move { self.process_clip(&subject_id, clip).await }),
        )
        .await
    }

    // ========================================================================
    // SESSIONS
    // ========================================================================

    /// Start or restart monitoring a subject
    ///
    /// # Errors
    /// * `SessionError::EmptySubjectId` - blank subject id
    /// * `SessionError::StatePoisoned` - session state unavailable
    pub fn start_monitoring(
        &self,
        subject_id: &str,
        sensitivity: Sensitivity,
    ) -> Result<SessionSnapshot, SessionError> {
        let snapshot = self
            .sessions
            .start(subject_id, sensitivity)
            .inspect_err(|err| log_session_error(err, "start_monitoring"))?;

        self.telemetry.publish(MonitorEvent::SessionChanged {
            subject_id: snapshot.subject_id.clone(),
            state: SessionState::Active,
            sensitivity: Some(sensitivity),
        });
        Ok(snapshot)
    }

    /// Start monitoring with a sensitivity given by name ("low", "medium", "high")
    ///
    /// # Errors
    /// * `SessionError::InvalidSensitivity` - unknown tier; no session is created
    pub fn start_monitoring_named(
        &self,
        subject_id: &str,
        sensitivity: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        let sensitivity: Sensitivity = sensitivity
            .parse()
            .inspect_err(|err| log_session_error(err, "start_monitoring_named"))?;
        self.start_monitoring(subject_id, sensitivity)
    }

    /// Stop monitoring a subject
    ///
    /// # Returns
    /// true if the subject was being monitored. Stopping an unknown or
    /// already stopped subject is a no-op.
    pub fn stop_monitoring(&self, subject_id: &str) -> Result<bool, SessionError> {
        let stopped = self
            .sessions
            .stop(subject_id)
            .inspect_err(|err| log_session_error(err, "stop_monitoring"))?;

        if stopped {
            self.telemetry.publish(MonitorEvent::SessionChanged {
                subject_id: subject_key(subject_id).to_string(),
                state: SessionState::NotMonitoring,
                sensitivity: None,
            });
        }
        Ok(stopped)
    }

    /// Session status; unknown subjects report NotMonitoring
    pub fn get_session_status(&self, subject_id: &str) -> Result<SessionSnapshot, SessionError> {
        self.sessions.status(subject_id)
    }

    /// Most recent incidents first, at most `limit`
    pub fn get_incident_history(
        &self,
        subject_id: &str,
        limit: usize,
    ) -> Result<Vec<Incident>, SessionError> {
        self.sessions.history(subject_id, limit)
    }

    /// Merge caller metadata (caregiver notes, outcome) into an incident
    pub fn amend_incident(
        &self,
        subject_id: &str,
        incident_id: u64,
        metadata: Map<String, Value>,
    ) -> Result<Incident, SessionError> {
        self.sessions.amend_incident(subject_id, incident_id, metadata)
    }

    pub fn get_aggregate_stats(&self) -> Result<AggregateStats, SessionError> {
        let mut stats = self.sessions.stats()?;
        stats.model_loaded = self.models.is_loaded();
        Ok(stats)
    }

    // ========================================================================
    // KEYWORDS
    // ========================================================================

    pub fn list_distress_keywords(&self) -> Result<Vec<String>, KeywordError> {
        self.keywords.catalogue().keywords()
    }

    /// Add a keyword; adding an existing keyword leaves the catalogue unchanged
    pub fn add_keyword(&self, keyword: &str) -> Result<AddOutcome, KeywordError> {
        self.keywords
            .catalogue()
            .add(keyword)
            .inspect_err(|err| log_keyword_error(err, "add_keyword"))
    }

    /// Remove a keyword and its variants
    ///
    /// # Returns
    /// false if the keyword was not in the catalogue
    pub fn remove_keyword(&self, keyword: &str) -> Result<bool, KeywordError> {
        self.keywords
            .catalogue()
            .remove(keyword)
            .inspect_err(|err| log_keyword_error(err, "remove_keyword"))
    }

    pub fn keyword_statistics(&self) -> Result<KeywordStatistics, KeywordError> {
        self.keywords.catalogue().statistics()
    }

    pub fn test_keyword_detection(&self, text: &str) -> Result<KeywordTestReport, KeywordError> {
        self.keywords.test_keyword_detection(text)
    }

    // ========================================================================
    // MODELS
    // ========================================================================

    /// Load `<model_type>.json` from the artifact directory and make it active
    ///
    /// On failure the previously active artifact stays in place.
    pub fn load_model(&self, model_type: &str) -> Result<ModelInfo, ModelError> {
        let artifact = self
            .models
            .load(model_type)
            .inspect_err(|err| log_model_error(err, "load_model"))?;
        Ok(self.announce_model(&artifact))
    }

    /// Validate and activate an in-memory artifact
    pub fn install_model(&self, artifact: ModelArtifact) -> Result<ModelInfo, ModelError> {
        let artifact = self
            .models
            .install(artifact)
            .inspect_err(|err| log_model_error(err, "install_model"))?;
        Ok(self.announce_model(&artifact))
    }

    /// Drop the active artifact; classification falls back to rules
    ///
    /// # Returns
    /// true if an artifact was active
    pub fn unload_model(&self) -> Result<bool, ModelError> {
        let unloaded = self
            .models
            .unload()
            .inspect_err(|err| log_model_error(err, "unload_model"))?;

        if unloaded {
            self.telemetry.publish(MonitorEvent::ModelSwapped {
                model_type: None,
                version: None,
            });
        }
        Ok(unloaded)
    }

    pub fn available_models(&self) -> Result<Vec<String>, ModelError> {
        self.models.available_models()
    }

    pub fn model_info(&self) -> Option<ModelInfo> {
        self.models.info()
    }

    // ========================================================================
    // TELEMETRY
    // ========================================================================

    pub fn subscribe_events(&self) -> broadcast::Receiver<MonitorEvent> {
        self.telemetry.subscribe()
    }

    pub fn event_stream(&self) -> impl Stream<Item = MonitorEvent> + Send + 'static {
        self.telemetry.stream()
    }

    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    // ========================================================================
    // HELPER METHODS
    // ========================================================================

    fn fallback_sensitivity(&self) -> Sensitivity {
        self.config.classifier.default_sensitivity
    }

    /// Admission with lock failures degraded to "unmonitored"
    fn admit(&self, subject_id: &str) -> Admission {
        let fallback = self.fallback_sensitivity();
        self.sessions
            .admit(subject_id, fallback)
            .unwrap_or_else(|err| {
                self.report_session_error(&err, "process_clip::admit");
                Admission {
                    logging: false,
                    thresholds: fallback.thresholds(),
                }
            })
    }

    /// Normalize on the blocking pool; a panicked task yields an empty signal
    async fn normalize(&self, clip: AudioClip) -> (Vec<f32>, u32) {
        let pipeline = Arc::clone(&self.pipeline);
        match tokio::task::spawn_blocking(move || pipeline.normalize(&clip)).await {
            Ok(normalized) => (normalized.samples, normalized.sample_rate),
            Err(join_err) => {
                let err = DetectionError::DecodeFailure {
                    reason: format!("normalization task failed: {}", join_err),
                };
                self.report_detection_error(&err, "process_clip::normalize");
                (Vec::new(), self.pipeline.sample_rate())
            }
        }
    }

    fn fuse(&self, decision: &FallDecision, keywords: &BTreeSet<String>) -> bool {
        decision.fall_detected || (self.config.keywords.alert_on_keywords && !keywords.is_empty())
    }

    fn log_incident(
        &self,
        subject_id: &str,
        decision: &FallDecision,
        features: &ClipFeatures,
        keywords: &BTreeSet<String>,
        timestamp: chrono::DateTime<Utc>,
    ) -> Option<u64> {
        let incident = NewIncident {
            timestamp,
            confidence: decision.confidence,
            features: features.vector,
            keywords: keywords.iter().cloned().collect(),
        };

        match self.sessions.record_fall(subject_id, incident) {
            Ok(incident) => {
                tracing::info!(
                    subject_id,
                    incident_id = incident.id,
                    confidence = incident.confidence,
                    "[MonitorContext] Incident recorded"
                );
                self.telemetry.publish(MonitorEvent::IncidentRecorded {
                    subject_id: subject_id.to_string(),
                    incident_id: incident.id,
                    confidence: incident.confidence,
                });
                Some(incident.id)
            }
            Err(err) => {
                self.report_session_error(&err, "process_clip::record_fall");
                None
            }
        }
    }

    fn announce_model(&self, artifact: &ModelArtifact) -> ModelInfo {
        let info = ModelInfo::from(artifact);
        self.telemetry.publish(MonitorEvent::ModelSwapped {
            model_type: Some(info.model_type.clone()),
            version: Some(info.version.clone()),
        });
        info
    }

    fn report_detection_error(&self, err: &DetectionError, context: &str) {
        log_detection_error(err, context);
        self.telemetry.publish(MonitorEvent::Error {
            code: err.code(),
            context: context.to_string(),
        });
    }

    fn report_session_error(&self, err: &SessionError, context: &str) {
        log_session_error(err, context);
        self.telemetry.publish(MonitorEvent::Error {
            code: err.code(),
            context: context.to_string(),
        });
    }
}

impl Default for MonitorContext {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::StaticTranscriber;

    fn silent_clip() -> Vec<u8> {
        vec![0u8; 3200]
    }

    /// 16-bit little-endian PCM of a loud square wave, which trips the
    /// impact, high-frequency and bright-spectrum cues
    fn loud_clip(seconds: f32) -> Vec<u8> {
        let sample_rate = 16_000;
        let n = (seconds * sample_rate as f32) as usize;
        let mut bytes = Vec::with_capacity(n * 2);
        for i in 0..n {
            let phase = (i as f32 * 3000.0 / sample_rate as f32).fract();
            let sample: i16 = if phase < 0.5 { 20_000 } else { -20_000 };
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }

    fn context_with_transcript(text: &str) -> MonitorContext {
        MonitorContext::with_collaborators(
            MonitorConfig::default(),
            Arc::new(StaticTranscriber::new(text)),
            Arc::new(WavDecoder),
        )
    }

    #[tokio::test]
    async fn test_silent_clip_is_quiet() {
        let context = MonitorContext::default();
        let result = context.process_clip("resident-1", silent_clip()).await;

        assert!(!result.fall_detected);
        assert!(result.keywords.is_empty());
        assert_eq!(result.recommendations, vec!["Continue monitoring".to_string()]);
        assert_eq!(result.incident_id, None);
    }

    #[tokio::test]
    async fn test_keyword_alert_logs_incident_for_active_session() {
        let context = context_with_transcript("Help, I fell");
        context
            .start_monitoring("resident-1", Sensitivity::Medium)
            .unwrap();

        let result = context.process_clip("resident-1", silent_clip()).await;

        assert!(result.fall_detected);
        assert!(result.keywords.contains("help"));
        assert!(result.keywords.contains("fall"));
        assert!(result.incident_id.is_some());

        let status = context.get_session_status("resident-1").unwrap();
        assert_eq!(status.fall_count, 1);
        assert_eq!(context.get_incident_history("resident-1", 10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unmonitored_subject_is_never_logged() {
        let context = context_with_transcript("help");
        let result = context.process_clip("visitor", silent_clip()).await;

        assert!(result.fall_detected);
        assert_eq!(result.incident_id, None);
        assert!(context.get_incident_history("visitor", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keyword_alert_can_be_disabled() {
        let mut config = MonitorConfig::default();
        config.keywords.alert_on_keywords = false;
        let context = MonitorContext::with_collaborators(
            config,
            Arc::new(StaticTranscriber::new("help")),
            Arc::new(WavDecoder),
        );

        let result = context.process_clip("resident-1", silent_clip()).await;
        assert!(!result.fall_detected);
        assert!(result.keywords.contains("help"));
    }

    #[tokio::test]
    async fn test_loud_clip_detected_by_rules() {
        let context = MonitorContext::default();
        context
            .start_monitoring("resident-1", Sensitivity::High)
            .unwrap();

        let result = context.process_clip("resident-1", loud_clip(1.0)).await;
        assert_eq!(
            result.classifier_path,
            crate::analysis::classifier::ClassifierPath::RuleBased
        );
        assert!(result.confidence > 0.4);
        assert!(result.fall_detected);
    }

    #[tokio::test]
    async fn test_padded_subject_id_reaches_its_session() {
        let context = context_with_transcript("help");
        context
            .start_monitoring(" bob ", Sensitivity::Medium)
            .unwrap();

        let result = context.process_clip(" bob ", silent_clip()).await;
        assert_eq!(result.subject_id, "bob");
        assert!(result.fall_detected);
        assert!(result.incident_id.is_some());

        let status = context.get_session_status(" bob ").unwrap();
        assert!(status.is_active());
        assert_eq!(status.fall_count, 1);
        assert_eq!(context.get_incident_history("bob", 5).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lanes_do_not_accumulate_across_subjects() {
        let context = MonitorContext::default();
        let batch: Vec<(String, Vec<u8>)> = (0..20)
            .map(|i| (format!("visitor-{}", i % 5), silent_clip()))
            .collect();

        let results = context.process_clips(batch).await;
        assert_eq!(results.len(), 20);
        assert_eq!(context.sessions.lane_count().unwrap(), 0);
    }

    #[test]
    fn test_invalid_sensitivity_creates_no_session() {
        let context = MonitorContext::default();
        let err = context
            .start_monitoring_named("resident-1", "extreme")
            .unwrap_err();

        assert!(matches!(err, SessionError::InvalidSensitivity { .. }));
        let status = context.get_session_status("resident-1").unwrap();
        assert!(!status.is_active());
        assert_eq!(context.get_aggregate_stats().unwrap().subjects_tracked, 0);
    }

    #[test]
    fn test_session_events_are_published() {
        let context = MonitorContext::default();
        context.start_monitoring_named("resident-1", "HIGH").unwrap();
        assert!(context.stop_monitoring("resident-1").unwrap());
        assert!(!context.stop_monitoring("resident-1").unwrap());

        let snapshot = context.telemetry_snapshot();
        assert_eq!(snapshot.recent.len(), 2);
        assert!(matches!(
            snapshot.recent[1],
            MonitorEvent::SessionChanged {
                state: SessionState::NotMonitoring,
                ..
            }
        ));
    }

    #[test]
    fn test_stats_report_model_state() {
        let context = MonitorContext::default();
        context.start_monitoring("a", Sensitivity::Low).unwrap();
        context.start_monitoring("b", Sensitivity::High).unwrap();
        context.stop_monitoring("b").unwrap();

        let stats = context.get_aggregate_stats().unwrap();
        assert_eq!(stats.active_sessions, 1);
        assert_eq!(stats.subjects_tracked, 2);
        assert_eq!(stats.total_falls, 0);
        assert!(!stats.model_loaded);
        assert!(context.model_info().is_none());
    }
}
