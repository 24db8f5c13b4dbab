// Classifier - fall decision from clip features
//
// Two interchangeable strategies are chosen once per call from artifact
// availability:
//
// Model: standardize the feature vector with the artifact's scaler and
//   compare P(fall) against the session's fall_threshold.
// RuleBased: additive cue scoring compared against the session's
//   confidence_threshold. Always available; also used when the model fails.
//
// Any failure on the rule path degrades to {fall_detected: false,
// confidence: 0.0}. Nothing is propagated to the caller.

use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::analysis::features::{AudioCharacteristics, FeatureVector};
use crate::config::ClassifierConfig;
use crate::error::{log_detection_error, DetectionError};
use crate::model::ModelArtifact;
use crate::session::Thresholds;

/// Which path produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierPath {
    Model,
    RuleBased,
    /// Both paths failed; the decision is the fixed no-fall default
    Degraded,
}

/// Classification strategy for one call
#[derive(Debug, Clone)]
pub enum Strategy {
    Model(Arc<ModelArtifact>),
    RuleBased,
}

impl Strategy {
    /// Model strategy when an artifact is active, rules otherwise
    pub fn select(active: Option<Arc<ModelArtifact>>) -> Self {
        match active {
            Some(artifact) => Strategy::Model(artifact),
            None => Strategy::RuleBased,
        }
    }
}

/// Binary fall decision with its confidence in [0.0, 1.0]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallDecision {
    pub fall_detected: bool,
    pub confidence: f32,
    pub path: ClassifierPath,
}

impl FallDecision {
    pub fn degraded() -> Self {
        Self {
            fall_detected: false,
            confidence: 0.0,
            path: ClassifierPath::Degraded,
        }
    }
}

/// Which rule-based cues fired
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleCues {
    pub impact: bool,
    pub high_frequency: bool,
    pub voice_activity: bool,
    pub bright_spectrum: bool,
}

/// FallClassifier applies the selected strategy to one clip
pub struct FallClassifier {
    config: ClassifierConfig,
}

impl FallClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify one clip
    ///
    /// # Arguments
    /// * `strategy` - Model or rule-based path, chosen by the caller
    /// * `features` - Clip feature vector
    /// * `characteristics` - Auxiliary measurements used by the rule cues
    /// * `thresholds` - Session thresholds captured at admission
    ///
    /// # Returns
    /// Decision with the path that produced it
    pub fn classify(
        &self,
        strategy: &Strategy,
        features: &FeatureVector,
        characteristics: &AudioCharacteristics,
        thresholds: Thresholds,
    ) -> FallDecision {
        if let Strategy::Model(artifact) = strategy {
            match artifact.predict_proba(features) {
                Ok(probability) => {
                    return FallDecision {
                        fall_detected: probability > thresholds.fall_threshold,
                        confidence: probability,
                        path: ClassifierPath::Model,
                    };
                }
                Err(err) => {
                    log_detection_error(&err, "FallClassifier::classify");
                    warn!(
                        "[Classifier] Model '{}' failed, falling back to rule-based scoring",
                        artifact.model_type
                    );
                }
            }
        }

        match self.rule_score(features, characteristics) {
            Ok(score) => FallDecision {
                fall_detected: score > thresholds.confidence_threshold,
                confidence: score,
                path: ClassifierPath::RuleBased,
            },
            Err(err) => {
                log_detection_error(&err, "FallClassifier::rule_score");
                FallDecision::degraded()
            }
        }
    }

    /// Evaluate which rule cues fire for a clip
    pub fn cues(&self, features: &FeatureVector, characteristics: &AudioCharacteristics) -> RuleCues {
        RuleCues {
            impact: features.rms_energy > self.config.impact_rms_floor,
            high_frequency: characteristics.high_freq_energy > characteristics.low_freq_energy,
            voice_activity: features.voice_activity_ratio > self.config.voice_activity_floor,
            bright_spectrum: features.spectral_centroid_mean > self.config.centroid_floor_hz,
        }
    }

    /// Additive rule-based fall score in [0.0, 1.0]
    ///
    /// Cues are independent, so the score does not depend on evaluation
    /// order and never decreases when a weight increases.
    pub fn rule_score(
        &self,
        features: &FeatureVector,
        characteristics: &AudioCharacteristics,
    ) -> Result<f32, DetectionError> {
        let inputs = [
            features.rms_energy,
            features.voice_activity_ratio,
            features.spectral_centroid_mean,
            characteristics.high_freq_energy,
            characteristics.low_freq_energy,
        ];
        if inputs.iter().any(|v| !v.is_finite()) {
            return Err(DetectionError::ClassificationFailure {
                reason: "non-finite rule input".to_string(),
            });
        }

        let cues = self.cues(features, characteristics);
        let weights = &self.config.weights;
        let score = [
            (cues.impact, weights.impact),
            (cues.high_frequency, weights.high_frequency),
            (cues.voice_activity, weights.voice_activity),
            (cues.bright_spectrum, weights.bright_spectrum),
        ]
        .iter()
        .filter(|(fired, _)| *fired)
        .map(|(_, weight)| weight.max(0.0))
        .sum::<f32>();

        Ok(score.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
