// Model artifact - versioned (model, scaler) pair produced by training
//
// Artifacts are JSON documents named `<model_type>.json`. The column list is
// checked against the extractor schema at load time so a vector produced by
// this build always lines up with the model's inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::features::{column_names, FeatureVector, FEATURE_COUNT};
use crate::error::{DetectionError, ModelError};

/// Per-column standardization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

impl Scaler {
    /// Identity scaler (mean 0, scale 1) over the full schema
    pub fn identity() -> Self {
        Self {
            mean: vec![0.0; FEATURE_COUNT],
            scale: vec![1.0; FEATURE_COUNT],
        }
    }

    /// Standardize a column-ordered vector: `(x - mean) / scale`
    ///
    /// A zero scale is treated as 1.0 (constant column during training).
    pub fn transform(&self, columns: &[f32]) -> Vec<f32> {
        columns
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(&x, (&mean, &scale))| {
                let scale = if scale == 0.0 { 1.0 } else { scale };
                (x - mean) / scale
            })
            .collect()
    }
}

/// One node of a binary decision tree
///
/// Samples with `x[feature] <= threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        probability: f32,
    },
}

/// Decision tree stored as a flat node array rooted at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Walk the tree for one scaled sample
    ///
    /// A walk longer than the node count means the tree has a cycle.
    pub fn predict(&self, scaled: &[f32]) -> Result<f32, DetectionError> {
        let mut index = 0usize;
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { probability }) => return Ok(*probability),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = scaled.get(*feature).copied().ok_or_else(|| {
                        DetectionError::ClassificationFailure {
                            reason: format!("split on missing feature {}", feature),
                        }
                    })?;
                    index = if value <= *threshold { *left } else { *right };
                }
                None => {
                    return Err(DetectionError::ClassificationFailure {
                        reason: format!("tree references missing node {}", index),
                    })
                }
            }
        }

        Err(DetectionError::ClassificationFailure {
            reason: "tree walk did not reach a leaf".to_string(),
        })
    }
}

/// Probabilistic model family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelKind {
    /// Logistic regression over scaled columns
    Logistic { weights: Vec<f32>, intercept: f32 },
    /// Random-forest style ensemble; P(fall) is the mean leaf probability
    Forest { trees: Vec<DecisionTree> },
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Logistic { .. } => "logistic",
            ModelKind::Forest { .. } => "forest",
        }
    }
}

/// Versioned model plus scaler, keyed by model type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_type: String,
    pub version: String,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
    pub feature_columns: Vec<String>,
    pub scaler: Scaler,
    pub model: ModelKind,
}

impl ModelArtifact {
    /// Parse and validate an artifact from JSON text
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let artifact: ModelArtifact = serde_json::from_str(json)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Check the artifact against the feature schema and its own structure
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.feature_columns.len() != FEATURE_COUNT {
            return Err(ModelError::SchemaMismatch {
                expected: FEATURE_COUNT,
                found: self.feature_columns.len(),
            });
        }

        let expected = column_names();
        if let Some((index, (found, wanted))) = self
            .feature_columns
            .iter()
            .zip(expected.iter())
            .enumerate()
            .find(|(_, (found, wanted))| found != wanted)
        {
            return Err(ModelError::InvalidArtifact {
                reason: format!("column {} is '{}', expected '{}'", index, found, wanted),
            });
        }

        if self.scaler.mean.len() != FEATURE_COUNT || self.scaler.scale.len() != FEATURE_COUNT {
            return Err(ModelError::InvalidArtifact {
                reason: format!(
                    "scaler has {} means and {} scales for {} columns",
                    self.scaler.mean.len(),
                    self.scaler.scale.len(),
                    FEATURE_COUNT
                ),
            });
        }

        match &self.model {
            ModelKind::Logistic { weights, .. } => {
                if weights.len() != FEATURE_COUNT {
                    return Err(ModelError::InvalidArtifact {
                        reason: format!(
                            "logistic model has {} weights for {} columns",
                            weights.len(),
                            FEATURE_COUNT
                        ),
                    });
                }
            }
            ModelKind::Forest { trees } => {
                if trees.is_empty() {
                    return Err(ModelError::InvalidArtifact {
                        reason: "forest has no trees".to_string(),
                    });
                }
                for (t, tree) in trees.iter().enumerate() {
                    validate_tree(t, tree)?;
                }
            }
        }

        Ok(())
    }

    /// Probability of a fall for one feature vector
    pub fn predict_proba(&self, features: &FeatureVector) -> Result<f32, DetectionError> {
        let scaled = self.scaler.transform(&features.to_columns());

        let probability = match &self.model {
            ModelKind::Logistic { weights, intercept } => {
                let logit: f32 = weights
                    .iter()
                    .zip(scaled.iter())
                    .map(|(w, x)| w * x)
                    .sum::<f32>()
                    + intercept;
                1.0 / (1.0 + (-logit).exp())
            }
            ModelKind::Forest { trees } => {
                if trees.is_empty() {
                    return Err(DetectionError::ClassificationFailure {
                        reason: "forest has no trees".to_string(),
                    });
                }
                let mut total = 0.0f32;
                for tree in trees {
                    total += tree.predict(&scaled)?;
                }
                total / trees.len() as f32
            }
        };

        if probability.is_finite() {
            Ok(probability.clamp(0.0, 1.0))
        } else {
            Err(DetectionError::ClassificationFailure {
                reason: "model produced a non-finite probability".to_string(),
            })
        }
    }
}

fn validate_tree(tree_index: usize, tree: &DecisionTree) -> Result<(), ModelError> {
    let invalid = |reason: String| ModelError::InvalidArtifact {
        reason: format!("tree {}: {}", tree_index, reason),
    };

    if tree.nodes.is_empty() {
        return Err(invalid("no nodes".to_string()));
    }

    for (index, node) in tree.nodes.iter().enumerate() {
        match node {
            TreeNode::Split {
                feature,
                left,
                right,
                ..
            } => {
                if *feature >= FEATURE_COUNT {
                    return Err(invalid(format!("node {} splits on feature {}", index, feature)));
                }
                // Children must point forward, which also rules out cycles
                if *left <= index || *right <= index {
                    return Err(invalid(format!("node {} has a backward child", index)));
                }
                if *left >= tree.nodes.len() || *right >= tree.nodes.len() {
                    return Err(invalid(format!("node {} has a missing child", index)));
                }
            }
            TreeNode::Leaf { probability } => {
                if !(0.0..=1.0).contains(probability) {
                    return Err(invalid(format!(
                        "node {} has probability {}",
                        index, probability
                    )));
                }
            }
        }
    }

    Ok(())
}
