// Error types for the fall monitor
//
// This module defines the error taxonomy for the detection pipeline, the
// session state machine, model artifact handling and the keyword catalogue.
// Every error carries a stable numeric code so callers can branch on it
// without matching message text.
//
// Hot-path errors (DetectionError) are absorbed by the stage that raised them
// and turned into degraded output. Only configuration errors (SessionError,
// ModelError, KeywordError) are surfaced to callers.

mod detection;
mod keyword;
mod model;
mod session;

pub use detection::{log_detection_error, DetectionError, DetectionErrorCodes};
pub use keyword::{log_keyword_error, KeywordError, KeywordErrorCodes};
pub use model::{log_model_error, ModelError, ModelErrorCodes};
pub use session::{log_session_error, SessionError, SessionErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
