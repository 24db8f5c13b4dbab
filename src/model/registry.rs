// Model registry - artifact loading and hot swap
//
// The active artifact lives behind `RwLock<Option<Arc<_>>>`. Classification
// clones the Arc under a short read lock and evaluates outside it, so a swap
// never exposes a partially replaced model to an in-flight call.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::artifact::ModelArtifact;
use crate::error::ModelError;

/// Summary of the active artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub version: String,
    pub kind: String,
    pub feature_count: usize,
    pub trained_at: Option<DateTime<Utc>>,
}

impl From<&ModelArtifact> for ModelInfo {
    fn from(artifact: &ModelArtifact) -> Self {
        Self {
            model_type: artifact.model_type.clone(),
            version: artifact.version.clone(),
            kind: artifact.model.name().to_string(),
            feature_count: artifact.feature_columns.len(),
            trained_at: artifact.trained_at,
        }
    }
}

pub struct ModelRegistry {
    artifact_dir: Option<PathBuf>,
    active: RwLock<Option<Arc<ModelArtifact>>>,
}

impl ModelRegistry {
    /// Create an empty registry
    ///
    /// # Arguments
    /// * `artifact_dir` - Directory holding `<model_type>.json` files, if any
    pub fn new(artifact_dir: Option<PathBuf>) -> Self {
        Self {
            artifact_dir,
            active: RwLock::new(None),
        }
    }

    pub fn artifact_dir(&self) -> Option<&Path> {
        self.artifact_dir.as_deref()
    }

    /// Path of the artifact file for a model type
    ///
    /// None without an artifact directory or when `model_type` is not a
    /// plain file stem (separators, leading dot, `..`).
    pub fn artifact_path(&self, model_type: &str) -> Option<PathBuf> {
        if !is_valid_model_type(model_type) {
            return None;
        }
        self.artifact_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", model_type)))
    }

    /// Load `<model_type>.json` from the artifact directory and make it active
    ///
    /// The previously active artifact stays in place if loading fails.
    pub fn load(&self, model_type: &str) -> Result<Arc<ModelArtifact>, ModelError> {
        if !is_valid_model_type(model_type) {
            return Err(ModelError::InvalidArtifact {
                reason: format!("model type {:?} is not a plain artifact name", model_type),
            });
        }

        let path = match self.artifact_path(model_type) {
            Some(path) if path.is_file() => path,
            _ => {
                return Err(ModelError::ArtifactNotFound {
                    model_type: model_type.to_string(),
                })
            }
        };

        let contents = fs::read_to_string(&path)?;
        let artifact = ModelArtifact::from_json(&contents)?;
        if artifact.model_type != model_type {
            warn!(
                "[ModelRegistry] Artifact {:?} declares model type '{}', loaded as '{}'",
                path, artifact.model_type, model_type
            );
        }

        info!(
            "[ModelRegistry] Loaded {} model '{}' version {} from {:?}",
            artifact.model.name(),
            model_type,
            artifact.version,
            path
        );
        let artifact = Arc::new(artifact);
        self.swap(Some(Arc::clone(&artifact)))?;
        Ok(artifact)
    }

    /// Validate and activate an artifact supplied in memory
    pub fn install(&self, artifact: ModelArtifact) -> Result<Arc<ModelArtifact>, ModelError> {
        artifact.validate()?;
        let artifact = Arc::new(artifact);
        info!(
            "[ModelRegistry] Installed {} model '{}' version {}",
            artifact.model.name(),
            artifact.model_type,
            artifact.version
        );
        self.swap(Some(Arc::clone(&artifact)))?;
        Ok(artifact)
    }

    /// Drop the active artifact; classification falls back to rules
    ///
    /// # Returns
    /// true if an artifact was active
    pub fn unload(&self) -> Result<bool, ModelError> {
        let previous = self.swap(None)?;
        if previous.is_some() {
            info!("[ModelRegistry] Unloaded active model");
        }
        Ok(previous.is_some())
    }

    /// Currently active artifact, if any
    ///
    /// A poisoned lock is reported as no model so callers use the rule path.
    pub fn active(&self) -> Option<Arc<ModelArtifact>> {
        match self.active.read() {
            Ok(guard) => guard.clone(),
            Err(_) => {
                log::error!("[ModelRegistry] Model slot lock poisoned, using rule-based path");
                None
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.active().is_some()
    }

    pub fn info(&self) -> Option<ModelInfo> {
        self.active().map(|artifact| ModelInfo::from(artifact.as_ref()))
    }

    /// Model types with an artifact file in the artifact directory, sorted
    pub fn available_models(&self) -> Result<Vec<String>, ModelError> {
        let dir = match &self.artifact_dir {
            Some(dir) if dir.is_dir() => dir,
            _ => return Ok(Vec::new()),
        };

        let mut models: Vec<String> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(String::from))
            .filter(|stem| is_valid_model_type(stem))
            .collect();
        models.sort();
        Ok(models)
    }

    fn swap(
        &self,
        next: Option<Arc<ModelArtifact>>,
    ) -> Result<Option<Arc<ModelArtifact>>, ModelError> {
        let mut slot = self.active.write().map_err(|_| ModelError::LockPoisoned)?;
        Ok(std::mem::replace(&mut *slot, next))
    }
}

/// Model types name files inside the artifact directory and nothing else
fn is_valid_model_type(model_type: &str) -> bool {
    !model_type.is_empty()
        && !model_type.starts_with('.')
        && model_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::features::{column_names, FEATURE_COUNT};
    use crate::model::{ModelKind, Scaler};

    fn artifact(model_type: &str, version: &str) -> ModelArtifact {
        ModelArtifact {
            model_type: model_type.to_string(),
            version: version.to_string(),
            trained_at: None,
            feature_columns: column_names(),
            scaler: Scaler::identity(),
            model: ModelKind::Logistic {
                weights: vec![0.0; FEATURE_COUNT],
                intercept: 0.0,
            },
        }
    }

    fn write_artifact(dir: &Path, artifact: &ModelArtifact) {
        let path = dir.join(format!("{}.json", artifact.model_type));
        fs::write(path, serde_json::to_string_pretty(artifact).unwrap()).unwrap();
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), &artifact("fall_detection", "3"));

        let registry = ModelRegistry::new(Some(dir.path().to_path_buf()));
        assert!(!registry.is_loaded());

        let loaded = registry.load("fall_detection").unwrap();
        assert_eq!(loaded.version, "3");
        assert_eq!(registry.info().unwrap().kind, "logistic");
        assert_eq!(registry.info().unwrap().feature_count, FEATURE_COUNT);
    }

    #[test]
    fn test_missing_artifact_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(Some(dir.path().to_path_buf()));
        registry.install(artifact("fall_detection", "1")).unwrap();

        assert_eq!(
            registry.load("distress"),
            Err(ModelError::ArtifactNotFound {
                model_type: "distress".to_string()
            })
        );
        assert_eq!(registry.info().unwrap().version, "1");
    }

    #[test]
    fn test_model_type_cannot_escape_artifact_dir() {
        let root = tempfile::tempdir().unwrap();
        let models = root.path().join("models");
        fs::create_dir(&models).unwrap();
        write_artifact(root.path(), &artifact("outside", "9"));

        let registry = ModelRegistry::new(Some(models.clone()));
        registry.install(artifact("fall_detection", "1")).unwrap();

        for model_type in ["../outside", "..", "sub/outside", "sub\\outside", ".hidden", ""] {
            assert!(registry.artifact_path(model_type).is_none());
            assert!(matches!(
                registry.load(model_type),
                Err(ModelError::InvalidArtifact { .. })
            ));
        }
        assert_eq!(registry.info().unwrap().version, "1");
        assert_eq!(
            registry.artifact_path("fall_detection-v2.1"),
            Some(models.join("fall_detection-v2.1.json"))
        );
    }

    #[test]
    fn test_no_directory_has_no_models() {
        let registry = ModelRegistry::new(None);
        assert!(registry.available_models().unwrap().is_empty());
        assert!(matches!(
            registry.load("fall_detection"),
            Err(ModelError::ArtifactNotFound { .. })
        ));
    }

    #[test]
    fn test_available_models_lists_json_stems() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), &artifact("fall_detection", "1"));
        write_artifact(dir.path(), &artifact("audio_classification", "1"));
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = ModelRegistry::new(Some(dir.path().to_path_buf()));
        assert_eq!(
            registry.available_models().unwrap(),
            vec!["audio_classification".to_string(), "fall_detection".to_string()]
        );
    }

    #[test]
    fn test_install_swaps_and_unload_clears() {
        let registry = ModelRegistry::new(None);
        let first = registry.install(artifact("fall_detection", "1")).unwrap();
        registry.install(artifact("fall_detection", "2")).unwrap();

        // Holders of the old Arc keep a complete artifact
        assert_eq!(first.version, "1");
        assert_eq!(registry.info().unwrap().version, "2");

        assert!(registry.unload().unwrap());
        assert!(!registry.unload().unwrap());
        assert!(registry.active().is_none());
    }

    #[test]
    fn test_invalid_artifact_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut broken = artifact("fall_detection", "1");
        broken.scaler.mean.pop();
        write_artifact(dir.path(), &broken);

        let registry = ModelRegistry::new(Some(dir.path().to_path_buf()));
        assert!(matches!(
            registry.load("fall_detection"),
            Err(ModelError::InvalidArtifact { .. })
        ));
        assert!(!registry.is_loaded());
    }
}
