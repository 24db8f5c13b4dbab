// Detection pipeline error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Detection error code constants
///
/// Error code range: 1001-1006
pub struct DetectionErrorCodes {}

impl DetectionErrorCodes {
    /// Audio bytes could not be decoded by the decode collaborator
    pub const DECODE_FAILURE: i32 = 1001;

    /// Feature extraction produced no usable statistics
    pub const FEATURE_EXTRACTION_FAILURE: i32 = 1002;

    /// Both classification strategies failed
    pub const CLASSIFICATION_FAILURE: i32 = 1003;

    /// Transcription did not finish within its deadline
    pub const TRANSCRIPTION_TIMEOUT: i32 = 1004;

    /// Transcription collaborator reported an error
    pub const TRANSCRIPTION_FAILURE: i32 = 1005;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1006;
}

/// Log a detection error with structured context
///
/// Detection errors never reach the caller of `process_clip`; this is the
/// only place they become visible.
pub fn log_detection_error(err: &DetectionError, context: &str) {
    error!(
        "Detection error in {}: code={}, component=DetectionPipeline, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Recoverable errors raised inside the detection hot path
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionError {
    /// Decoder rejected the buffer (raw PCM fallback applies)
    DecodeFailure { reason: String },

    /// Feature statistics could not be computed (zero-filled vector applies)
    FeatureExtractionFailure { reason: String },

    /// Classifier could not produce a decision (degrades to no fall, 0.0)
    ClassificationFailure { reason: String },

    /// Transcription exceeded its deadline (acoustic-only path applies)
    TranscriptionTimeout { timeout_ms: u64 },

    /// Transcription collaborator failed (acoustic-only path applies)
    TranscriptionFailure { reason: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },
}

impl ErrorCode for DetectionError {
    fn code(&self) -> i32 {
        match self {
            DetectionError::DecodeFailure { .. } => DetectionErrorCodes::DECODE_FAILURE,
            DetectionError::FeatureExtractionFailure { .. } => {
                DetectionErrorCodes::FEATURE_EXTRACTION_FAILURE
            }
            DetectionError::ClassificationFailure { .. } => {
                DetectionErrorCodes::CLASSIFICATION_FAILURE
            }
            DetectionError::TranscriptionTimeout { .. } => {
                DetectionErrorCodes::TRANSCRIPTION_TIMEOUT
            }
            DetectionError::TranscriptionFailure { .. } => {
                DetectionErrorCodes::TRANSCRIPTION_FAILURE
            }
            DetectionError::LockPoisoned { .. } => DetectionErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            DetectionError::DecodeFailure { reason } => {
                format!("Audio decode failed: {}", reason)
            }
            DetectionError::FeatureExtractionFailure { reason } => {
                format!("Feature extraction failed: {}", reason)
            }
            DetectionError::ClassificationFailure { reason } => {
                format!("Classification failed: {}", reason)
            }
            DetectionError::TranscriptionTimeout { timeout_ms } => {
                format!("Transcription timed out after {} ms", timeout_ms)
            }
            DetectionError::TranscriptionFailure { reason } => {
                format!("Transcription failed: {}", reason)
            }
            DetectionError::LockPoisoned { component } => {
                format!("Lock poisoned for component: {}", component)
            }
        }
    }
}

impl fmt::Display for DetectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DetectionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for DetectionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_error_codes() {
        assert_eq!(
            DetectionError::DecodeFailure {
                reason: "x".to_string()
            }
            .code(),
            1001
        );
        assert_eq!(
            DetectionError::TranscriptionTimeout { timeout_ms: 10 }.code(),
            DetectionErrorCodes::TRANSCRIPTION_TIMEOUT
        );
        assert_eq!(
            DetectionError::LockPoisoned {
                component: "sessions".to_string()
            }
            .code(),
            1006
        );
    }

    #[test]
    fn test_detection_error_display() {
        let err = DetectionError::TranscriptionTimeout { timeout_ms: 3000 };
        let display = format!("{}", err);
        assert!(display.contains("DetectionError"));
        assert!(display.contains("1004"));
        assert!(display.contains("3000 ms"));
    }
}
