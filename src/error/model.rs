// Model artifact error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Model error code constants
///
/// Error code range: 3001-3006
pub struct ModelErrorCodes {}

impl ModelErrorCodes {
    /// No artifact file exists for the requested model type
    pub const ARTIFACT_NOT_FOUND: i32 = 3001;

    /// Artifact file could not be read
    pub const IO: i32 = 3002;

    /// Artifact JSON could not be parsed
    pub const PARSE: i32 = 3003;

    /// Artifact columns differ from the feature vector schema
    pub const SCHEMA_MISMATCH: i32 = 3004;

    /// Artifact is structurally invalid (dimension mismatch, bad tree)
    pub const INVALID_ARTIFACT: i32 = 3005;

    /// Active model slot lock was poisoned
    pub const LOCK_POISONED: i32 = 3006;
}

/// Log a model error with structured context
pub fn log_model_error(err: &ModelError, context: &str) {
    error!(
        "Model error in {}: code={}, component=ModelRegistry, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while loading, validating or evaluating model artifacts
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// No artifact for this model type in the artifact directory
    ArtifactNotFound { model_type: String },

    /// Filesystem error while reading an artifact
    Io { details: String },

    /// Artifact JSON was malformed
    Parse { details: String },

    /// Artifact feature columns do not match the extractor schema
    SchemaMismatch { expected: usize, found: usize },

    /// Artifact failed structural validation or evaluation
    InvalidArtifact { reason: String },

    /// Active model slot lock was poisoned
    LockPoisoned,
}

impl ErrorCode for ModelError {
    fn code(&self) -> i32 {
        match self {
            ModelError::ArtifactNotFound { .. } => ModelErrorCodes::ARTIFACT_NOT_FOUND,
            ModelError::Io { .. } => ModelErrorCodes::IO,
            ModelError::Parse { .. } => ModelErrorCodes::PARSE,
            ModelError::SchemaMismatch { .. } => ModelErrorCodes::SCHEMA_MISMATCH,
            ModelError::InvalidArtifact { .. } => ModelErrorCodes::INVALID_ARTIFACT,
            ModelError::LockPoisoned => ModelErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            ModelError::ArtifactNotFound { model_type } => {
                format!("No artifact found for model type '{}'", model_type)
            }
            ModelError::Io { details } => format!("Artifact I/O error: {}", details),
            ModelError::Parse { details } => format!("Artifact parse error: {}", details),
            ModelError::SchemaMismatch { expected, found } => {
                format!(
                    "Feature schema mismatch: expected {} columns, artifact has {}",
                    expected, found
                )
            }
            ModelError::InvalidArtifact { reason } => format!("Invalid artifact: {}", reason),
            ModelError::LockPoisoned => "Model slot lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ModelError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ModelError {}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::Io {
            details: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Parse {
            details: err.to_string(),
        }
    }
}
