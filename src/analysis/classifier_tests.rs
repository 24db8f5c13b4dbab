use super::*;
use crate::analysis::features::{column_names, FEATURE_COUNT};
use crate::config::RuleWeights;
use crate::model::{DecisionTree, ModelKind, Scaler, TreeNode};
use crate::session::Sensitivity;

/// Features and characteristics that fire every rule cue
fn all_cues() -> (FeatureVector, AudioCharacteristics) {
    let features = FeatureVector {
        rms_energy: 0.15,
        voice_activity_ratio: 0.6,
        spectral_centroid_mean: 2200.0,
        ..FeatureVector::default()
    };
    let characteristics = AudioCharacteristics {
        high_freq_energy: 12.0,
        low_freq_energy: 4.0,
        ..AudioCharacteristics::default()
    };
    (features, characteristics)
}

/// Helper to build a logistic artifact with a constant output
fn constant_model(probability: f32) -> Arc<ModelArtifact> {
    let logit = (probability / (1.0 - probability)).ln();
    Arc::new(ModelArtifact {
        model_type: "fall_detection".to_string(),
        version: "test".to_string(),
        trained_at: None,
        feature_columns: column_names(),
        scaler: Scaler::identity(),
        model: ModelKind::Logistic {
            weights: vec![0.0; FEATURE_COUNT],
            intercept: logit,
        },
    })
}

#[test]
fn test_all_cues_score_one_and_fall_at_medium() {
    let classifier = FallClassifier::new(ClassifierConfig::default());
    let (features, characteristics) = all_cues();

    let decision = classifier.classify(
        &Strategy::RuleBased,
        &features,
        &characteristics,
        Sensitivity::Medium.thresholds(),
    );

    assert!((decision.confidence - 1.0).abs() < 1e-6, "score {}", decision.confidence);
    assert!(decision.fall_detected);
    assert_eq!(decision.path, ClassifierPath::RuleBased);
}

#[test]
fn test_no_cues_score_zero() {
    let classifier = FallClassifier::new(ClassifierConfig::default());
    let score = classifier
        .rule_score(&FeatureVector::default(), &AudioCharacteristics::default())
        .unwrap();
    assert_eq!(score, 0.0);
}

#[test]
fn test_partial_cues_against_tiers() {
    let classifier = FallClassifier::new(ClassifierConfig::default());
    let (mut features, characteristics) = all_cues();
    // Impact + high frequency only: 0.5
    features.voice_activity_ratio = 0.2;
    features.spectral_centroid_mean = 1500.0;

    let score = classifier.rule_score(&features, &characteristics).unwrap();
    assert!((score - 0.5).abs() < 1e-6);

    let at = |sensitivity: Sensitivity| {
        classifier
            .classify(&Strategy::RuleBased, &features, &characteristics, sensitivity.thresholds())
            .fall_detected
    };
    assert!(at(Sensitivity::High));
    assert!(!at(Sensitivity::Medium));
    assert!(!at(Sensitivity::Low));
}

#[test]
fn test_rule_score_monotonic_in_each_weight() {
    let (mut features, characteristics) = all_cues();
    features.voice_activity_ratio = 0.1;

    let base = RuleWeights {
        impact: 0.1,
        high_frequency: 0.1,
        voice_activity: 0.1,
        bright_spectrum: 0.1,
    };

    let setters: [fn(&mut RuleWeights, f32); 4] = [
        |w, v| w.impact = v,
        |w, v| w.high_frequency = v,
        |w, v| w.voice_activity = v,
        |w, v| w.bright_spectrum = v,
    ];

    for set in setters {
        let mut previous = f32::NEG_INFINITY;
        for step in 0..=10 {
            let mut weights = base;
            set(&mut weights, step as f32 * 0.1);
            let config = ClassifierConfig {
                weights,
                ..ClassifierConfig::default()
            };
            let score = FallClassifier::new(config)
                .rule_score(&features, &characteristics)
                .unwrap();
            assert!(score >= previous, "score {} dropped below {}", score, previous);
            previous = score;
        }
    }
}

#[test]
fn test_model_path_uses_fall_threshold() {
    let classifier = FallClassifier::new(ClassifierConfig::default());
    let strategy = Strategy::Model(constant_model(0.65));

    let medium = classifier.classify(
        &strategy,
        &FeatureVector::default(),
        &AudioCharacteristics::default(),
        Sensitivity::Medium.thresholds(),
    );
    assert_eq!(medium.path, ClassifierPath::Model);
    assert!((medium.confidence - 0.65).abs() < 1e-4);
    assert!(!medium.fall_detected);

    let high = classifier.classify(
        &strategy,
        &FeatureVector::default(),
        &AudioCharacteristics::default(),
        Sensitivity::High.thresholds(),
    );
    assert!(high.fall_detected);
}

#[test]
fn test_model_failure_falls_back_to_rules() {
    let classifier = FallClassifier::new(ClassifierConfig::default());
    let mut broken = (*constant_model(0.9)).clone();
    broken.model = ModelKind::Forest {
        trees: vec![DecisionTree {
            nodes: vec![TreeNode::Split {
                feature: 0,
                threshold: 0.0,
                left: 7,
                right: 7,
            }],
        }],
    };
    let (features, characteristics) = all_cues();

    let decision = classifier.classify(
        &Strategy::Model(Arc::new(broken)),
        &features,
        &characteristics,
        Sensitivity::Medium.thresholds(),
    );
    assert_eq!(decision.path, ClassifierPath::RuleBased);
    assert!(decision.fall_detected);
}

#[test]
fn test_non_finite_rule_input_degrades() {
    let classifier = FallClassifier::new(ClassifierConfig::default());
    let features = FeatureVector {
        rms_energy: f32::NAN,
        ..FeatureVector::default()
    };

    let decision = classifier.classify(
        &Strategy::RuleBased,
        &features,
        &AudioCharacteristics::default(),
        Sensitivity::High.thresholds(),
    );
    assert_eq!(decision, FallDecision::degraded());
}

#[test]
fn test_strategy_selection() {
    assert!(matches!(Strategy::select(None), Strategy::RuleBased));
    assert!(matches!(
        Strategy::select(Some(constant_model(0.5))),
        Strategy::Model(_)
    ));
}
