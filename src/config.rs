//! Configuration management for the fall monitor
//!
//! This module provides runtime configuration loading from JSON files so
//! cue weights, acoustic thresholds and collaborator deadlines can be tuned
//! without recompilation. Every field has a default; a missing or invalid
//! file yields the default configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::session::Sensitivity;

/// Complete monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub audio: AudioConfig,
    pub classifier: ClassifierConfig,
    pub keywords: KeywordConfig,
    pub transcription: TranscriptionConfig,
    pub model: ModelConfig,
    pub telemetry: TelemetryConfig,
}

/// Audio normalization parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Canonical analysis sample rate in Hz
    pub sample_rate: u32,
    /// Frames quieter than this many dB below the loudest frame are trimmed
    pub trim_top_db: f32,
    /// Pre-emphasis filter coefficient (0 disables)
    pub pre_emphasis: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            trim_top_db: 20.0,
            pre_emphasis: 0.97,
        }
    }
}

/// Additive cue weights for the rule-based fall scorer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleWeights {
    /// Loud impact (rms_energy above the impact floor)
    pub impact: f32,
    /// High-band energy exceeding low-band energy
    pub high_frequency: f32,
    /// Sustained voice activity (possible distress call)
    pub voice_activity: f32,
    /// Bright spectrum (centroid above the centroid floor)
    pub bright_spectrum: f32,
}

impl Default for RuleWeights {
    fn default() -> Self {
        Self {
            impact: 0.3,
            high_frequency: 0.2,
            voice_activity: 0.3,
            bright_spectrum: 0.2,
        }
    }
}

/// Fall classifier parameters
///
/// The cue weights and floors are uncalibrated defaults carried over from the
/// first deployment and are expected to be tuned per installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub weights: RuleWeights,
    /// rms_energy above this counts as an impact
    pub impact_rms_floor: f32,
    /// voice_activity_ratio above this counts as sustained activity
    pub voice_activity_floor: f32,
    /// spectral_centroid_mean above this (Hz) counts as bright
    pub centroid_floor_hz: f32,
    /// Thresholds applied to clips from subjects without a session
    pub default_sensitivity: Sensitivity,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            weights: RuleWeights::default(),
            impact_rms_floor: 0.1,
            voice_activity_floor: 0.5,
            centroid_floor_hz: 2000.0,
            default_sensitivity: Sensitivity::Medium,
        }
    }
}

/// Thresholds for the acoustic distress predicates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcousticThresholds {
    pub distress_rms: f32,
    pub distress_voice_activity: f32,
    pub distress_pitch_std_hz: f32,
    pub distress_centroid_std_hz: f32,
    pub emergency_rms: f32,
    pub emergency_voice_activity: f32,
    pub emergency_pitch_mean_hz: f32,
    pub emergency_centroid_mean_hz: f32,
    pub pain_rms: f32,
    pub pain_pitch_mean_hz: f32,
    pub pain_zcr: f32,
    pub pain_cepstral_spread: f32,
}

impl Default for AcousticThresholds {
    fn default() -> Self {
        Self {
            distress_rms: 0.1,
            distress_voice_activity: 0.7,
            distress_pitch_std_hz: 100.0,
            distress_centroid_std_hz: 500.0,
            emergency_rms: 0.2,
            emergency_voice_activity: 0.8,
            emergency_pitch_mean_hz: 200.0,
            emergency_centroid_mean_hz: 3000.0,
            pain_rms: 0.05,
            pain_pitch_mean_hz: 150.0,
            pain_zcr: 0.1,
            pain_cepstral_spread: 50.0,
        }
    }
}

/// Distress keyword detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub acoustic: AcousticThresholds,
    /// Any detected keyword raises the fused alert even without a fall decision
    pub alert_on_keywords: bool,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            acoustic: AcousticThresholds::default(),
            alert_on_keywords: true,
        }
    }
}

/// Transcription collaborator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Deadline for a single transcription call
    pub timeout_ms: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self { timeout_ms: 3_000 }
    }
}

/// Model artifact parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding `<model_type>.json` artifacts
    pub artifact_dir: Option<PathBuf>,
    /// Artifact key used for fall classification
    pub model_type: String,
    /// Load the artifact when the context is created
    pub load_on_startup: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_dir: None,
            model_type: "fall_detection".to_string(),
            load_on_startup: true,
        }
    }
}

/// Telemetry collector sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Broadcast channel capacity
    pub buffer: usize,
    /// Number of recent events retained for snapshots
    pub history_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            buffer: 256,
            history_capacity: 64,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the default configuration if the file
    /// doesn't exist or its JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.audio.sample_rate, 16_000);
        assert_eq!(config.classifier.weights.impact, 0.3);
        assert_eq!(config.classifier.centroid_floor_hz, 2000.0);
        assert_eq!(config.classifier.default_sensitivity, Sensitivity::Medium);
        assert_eq!(config.transcription.timeout_ms, 3_000);
        assert_eq!(config.model.model_type, "fall_detection");
        assert!(config.keywords.alert_on_keywords);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{ "classifier": { "impact_rms_floor": 0.25 }, "transcription": { "timeout_ms": 500 } }"#;
        let config: MonitorConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.classifier.impact_rms_floor, 0.25);
        assert_eq!(config.classifier.weights, RuleWeights::default());
        assert_eq!(config.transcription.timeout_ms, 500);
        assert_eq!(config.audio.trim_top_db, 20.0);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = MonitorConfig::load_from_file("/nonexistent/fall_monitor.json");
        assert_eq!(config.keywords.acoustic.emergency_rms, 0.2);
    }

    #[test]
    fn test_invalid_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = MonitorConfig::load_from_file(&path);
        assert_eq!(config.telemetry.history_capacity, 64);
    }
}
