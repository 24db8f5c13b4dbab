// Acoustic distress patterns
//
// Three fixed predicates over clip features. Each one that holds contributes
// its label to the detected keyword set alongside any lexical matches.

use crate::analysis::features::{AudioCharacteristics, FeatureVector};
use crate::config::AcousticThresholds;

pub const DISTRESS_CALL: &str = "distress_call";
pub const EMERGENCY_CALL: &str = "emergency_call";
pub const PAIN_EXPRESSION: &str = "pain_expression";

pub struct AcousticPatterns {
    thresholds: AcousticThresholds,
}

impl AcousticPatterns {
    pub fn new(thresholds: AcousticThresholds) -> Self {
        Self { thresholds }
    }

    /// Loud sustained vocalization, or strongly varying pitch or brightness
    pub fn is_distress_call(&self, features: &FeatureVector, c: &AudioCharacteristics) -> bool {
        let t = &self.thresholds;
        (features.rms_energy > t.distress_rms
            && features.voice_activity_ratio > t.distress_voice_activity)
            || c.pitch_std > t.distress_pitch_std_hz
            || features.spectral_centroid_std > t.distress_centroid_std_hz
    }

    /// Very loud, or dense high-pitched vocalization, or a very bright spectrum
    pub fn is_emergency_call(&self, features: &FeatureVector, c: &AudioCharacteristics) -> bool {
        let t = &self.thresholds;
        features.rms_energy > t.emergency_rms
            || (features.voice_activity_ratio > t.emergency_voice_activity
                && c.pitch_mean > t.emergency_pitch_mean_hz)
            || features.spectral_centroid_mean > t.emergency_centroid_mean_hz
    }

    /// Low voiced moaning, noisy breath, or a widely spread cepstrum
    ///
    /// The low-pitch cue needs at least one voiced frame; an unvoiced clip
    /// reports pitch 0.0 and does not count as low.
    pub fn is_pain_expression(&self, features: &FeatureVector, c: &AudioCharacteristics) -> bool {
        let t = &self.thresholds;
        (features.rms_energy > t.pain_rms && c.pitch_mean > 0.0 && c.pitch_mean < t.pain_pitch_mean_hz)
            || features.zero_crossing_rate > t.pain_zcr
            || c.cepstral_spread > t.pain_cepstral_spread
    }

    /// Labels of every predicate that holds
    pub fn detect(&self, features: &FeatureVector, c: &AudioCharacteristics) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.is_distress_call(features, c) {
            labels.push(DISTRESS_CALL);
        }
        if self.is_emergency_call(features, c) {
            labels.push(EMERGENCY_CALL);
        }
        if self.is_pain_expression(features, c) {
            labels.push(PAIN_EXPRESSION);
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> AcousticPatterns {
        AcousticPatterns::new(AcousticThresholds::default())
    }

    #[test]
    fn test_quiet_clip_has_no_patterns() {
        let labels = patterns().detect(&FeatureVector::default(), &AudioCharacteristics::default());
        assert!(labels.is_empty());
    }

    #[test]
    fn test_distress_requires_loud_and_sustained() {
        let p = patterns();
        let c = AudioCharacteristics::default();

        let loud_brief = FeatureVector {
            rms_energy: 0.15,
            voice_activity_ratio: 0.3,
            ..FeatureVector::default()
        };
        assert!(!p.is_distress_call(&loud_brief, &c));

        let loud_sustained = FeatureVector {
            voice_activity_ratio: 0.75,
            ..loud_brief
        };
        assert!(p.is_distress_call(&loud_sustained, &c));

        let wobbling = AudioCharacteristics {
            pitch_std: 120.0,
            ..AudioCharacteristics::default()
        };
        assert!(p.is_distress_call(&FeatureVector::default(), &wobbling));
    }

    #[test]
    fn test_emergency_predicates() {
        let p = patterns();
        let shout = FeatureVector {
            rms_energy: 0.25,
            ..FeatureVector::default()
        };
        assert!(p.is_emergency_call(&shout, &AudioCharacteristics::default()));

        let dense = FeatureVector {
            voice_activity_ratio: 0.9,
            ..FeatureVector::default()
        };
        let low_voice = AudioCharacteristics {
            pitch_mean: 150.0,
            ..AudioCharacteristics::default()
        };
        let high_voice = AudioCharacteristics {
            pitch_mean: 260.0,
            ..AudioCharacteristics::default()
        };
        assert!(!p.is_emergency_call(&dense, &low_voice));
        assert!(p.is_emergency_call(&dense, &high_voice));
    }

    #[test]
    fn test_pain_low_pitch_needs_voicing() {
        let p = patterns();
        let moan = FeatureVector {
            rms_energy: 0.08,
            ..FeatureVector::default()
        };

        assert!(!p.is_pain_expression(&moan, &AudioCharacteristics::default()));
        let voiced = AudioCharacteristics {
            pitch_mean: 110.0,
            ..AudioCharacteristics::default()
        };
        assert!(p.is_pain_expression(&moan, &voiced));
        assert_eq!(p.detect(&moan, &voiced), vec![PAIN_EXPRESSION]);
    }
}
