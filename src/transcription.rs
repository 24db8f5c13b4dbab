// Transcription bridge - deadline-bounded calls into a speech-to-text backend
//
// The backend is an external collaborator behind the `Transcriber` trait.
// Calls run on tokio's blocking pool under a timeout; on timeout or failure
// the caller continues with acoustic-only keyword detection.

use std::sync::Arc;
use std::time::Duration;

use crate::error::DetectionError;

/// Speech-to-text collaborator
///
/// Implementations may block; they are always invoked off the async
/// executor.
pub trait Transcriber: Send + Sync + 'static {
    /// Best-effort transcript of a normalized clip
    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String, DetectionError>;
}

/// Backend that never hears anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTranscriber;

impl Transcriber for NullTranscriber {
    fn transcribe(&self, _samples: &[f32], _sample_rate: u32) -> Result<String, DetectionError> {
        Ok(String::new())
    }
}

/// Backend that returns the same text for every clip
///
/// Used for offline analysis when a transcript is already known.
#[derive(Debug, Clone)]
pub struct StaticTranscriber {
    text: String,
}

impl StaticTranscriber {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Transcriber for StaticTranscriber {
    fn transcribe(&self, _samples: &[f32], _sample_rate: u32) -> Result<String, DetectionError> {
        Ok(self.text.clone())
    }
}

pub struct TranscriptionBridge {
    transcriber: Arc<dyn Transcriber>,
    timeout: Duration,
}

impl TranscriptionBridge {
    /// # Arguments
    /// * `transcriber` - Speech-to-text backend
    /// * `timeout` - Deadline for a single call
    pub fn new(transcriber: Arc<dyn Transcriber>, timeout: Duration) -> Self {
        Self {
            transcriber,
            timeout,
        }
    }

    /// Transcribe a clip, lowercasing the result
    ///
    /// # Errors
    /// * `DetectionError::TranscriptionTimeout` - deadline exceeded
    /// * `DetectionError::TranscriptionFailure` - backend error or panic
    pub async fn transcribe(
        &self,
        samples: Arc<Vec<f32>>,
        sample_rate: u32,
    ) -> Result<String, DetectionError> {
        let transcriber = Arc::clone(&self.transcriber);
        let task =
            tokio::task::spawn_blocking(move || transcriber.transcribe(&samples, sample_rate));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(text))) => Ok(text.trim().to_lowercase()),
            Ok(Ok(Err(err))) => Err(err),
            Ok(Err(join_err)) => Err(DetectionError::TranscriptionFailure {
                reason: format!("transcription task failed: {}", join_err),
            }),
            Err(_) => Err(DetectionError::TranscriptionTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}
