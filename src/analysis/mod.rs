// Analysis module - per-clip detection pipeline
//
// Pipeline: AudioNormalizer -> FeatureExtractor -> FallClassifier, with the
// DistressKeywordDetector fused in by MonitorContext.
//
// - features: fixed-schema feature vector and auxiliary characteristics
// - classifier: model / rule-based fall decision
// - DetectionResult: everything reported back for one clip

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod classifier;
pub mod features;

use crate::audio::{AudioClip, AudioNormalizer, NormalizedAudio};
use crate::config::MonitorConfig;
use classifier::{ClassifierPath, FallClassifier};
use features::{AudioCharacteristics, ClipFeatures, FeatureExtractor, FeatureVector};

/// Outcome of processing one clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub subject_id: String,
    /// Fused decision: classifier fall or any distress keyword
    pub fall_detected: bool,
    /// Classifier confidence in [0.0, 1.0]
    pub confidence: f32,
    pub features: FeatureVector,
    pub characteristics: AudioCharacteristics,
    /// Lexical matches and acoustic pattern labels, deduplicated
    pub keywords: BTreeSet<String>,
    pub classifier_path: ClassifierPath,
    /// Lowercase transcript; empty when transcription was unavailable
    pub transcript: String,
    pub recommendations: Vec<String>,
    /// Id of the incident logged for this clip, if any
    pub incident_id: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

/// Caregiver guidance for a fused decision
pub fn recommendations(fall_detected: bool, keywords: &BTreeSet<String>) -> Vec<String> {
    let mut guidance: Vec<&str> = Vec::new();

    if fall_detected {
        guidance.extend([
            "Check on the person immediately",
            "Call emergency services if needed",
            "Assess for injuries",
            "Document the incident",
        ]);
    }

    if !keywords.is_empty() {
        guidance.extend([
            "Respond to distress calls immediately",
            "Check for medical emergencies",
            "Provide comfort and reassurance",
            "Contact healthcare provider if needed",
        ]);
    }

    if guidance.is_empty() {
        guidance.push("Continue monitoring");
    }

    guidance.into_iter().map(String::from).collect()
}

/// Blocking DSP stages shared by every clip
///
/// Owns no per-clip state; one instance serves concurrent clips from the
/// blocking pool.
pub struct AnalysisPipeline {
    normalizer: AudioNormalizer,
    extractor: FeatureExtractor,
    classifier: FallClassifier,
}

impl AnalysisPipeline {
    pub fn new(config: &MonitorConfig) -> Self {
        Self::with_normalizer(config, AudioNormalizer::new(config.audio.clone()))
    }

    /// Pipeline with a caller-supplied normalizer (custom decoder)
    pub fn with_normalizer(config: &MonitorConfig, normalizer: AudioNormalizer) -> Self {
        let sample_rate = normalizer.sample_rate();
        Self {
            normalizer,
            extractor: FeatureExtractor::new(sample_rate),
            classifier: FallClassifier::new(config.classifier.clone()),
        }
    }

    /// Canonical analysis sample rate
    pub fn sample_rate(&self) -> u32 {
        self.normalizer.sample_rate()
    }

    pub fn normalize(&self, clip: &AudioClip) -> NormalizedAudio {
        self.normalizer.normalize(clip)
    }

    pub fn extract(&self, samples: &[f32]) -> ClipFeatures {
        self.extractor.analyze(samples)
    }

    pub fn classifier(&self) -> &FallClassifier {
        &self.classifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_clip_recommends_monitoring() {
        assert_eq!(
            recommendations(false, &BTreeSet::new()),
            vec!["Continue monitoring".to_string()]
        );
    }

    #[test]
    fn test_fall_and_keywords_combine_guidance() {
        let keywords: BTreeSet<String> = ["help".to_string()].into_iter().collect();

        let fall_only = recommendations(true, &BTreeSet::new());
        assert_eq!(fall_only.len(), 4);
        assert_eq!(fall_only[0], "Check on the person immediately");

        let both = recommendations(true, &keywords);
        assert_eq!(both.len(), 8);
        assert!(both.contains(&"Respond to distress calls immediately".to_string()));
        assert!(!both.contains(&"Continue monitoring".to_string()));
    }

    #[test]
    fn test_pipeline_handles_garbage_bytes() {
        let pipeline = AnalysisPipeline::new(&MonitorConfig::default());
        let normalized = pipeline.normalize(&AudioClip::new(vec![0x01]));
        let features = pipeline.extract(&normalized.samples);

        assert!(features.vector.to_columns().iter().all(|v| v.is_finite()));
    }
}
