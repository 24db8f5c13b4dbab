// Session error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Session error code constants
///
/// Error code range: 2001-2004
pub struct SessionErrorCodes {}

impl SessionErrorCodes {
    /// Sensitivity tier is not one of low/medium/high
    pub const INVALID_SENSITIVITY: i32 = 2001;

    /// Subject identifier is empty
    pub const EMPTY_SUBJECT_ID: i32 = 2002;

    /// Incident id does not exist in the subject's history
    pub const UNKNOWN_INCIDENT: i32 = 2003;

    /// Session map or incident log lock was poisoned
    pub const STATE_POISONED: i32 = 2004;
}

/// Log a session error with structured context
pub fn log_session_error(err: &SessionError, context: &str) {
    error!(
        "Session error in {}: code={}, component=SessionManager, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors rejected by the session state machine
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Sensitivity tier could not be parsed; no session is created
    InvalidSensitivity { value: String },

    /// Subject identifier was empty or whitespace
    EmptySubjectId,

    /// Incident amendment targeted an id that was never logged
    UnknownIncident { subject_id: String, incident_id: u64 },

    /// Session state lock was poisoned
    StatePoisoned,
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::InvalidSensitivity { .. } => SessionErrorCodes::INVALID_SENSITIVITY,
            SessionError::EmptySubjectId => SessionErrorCodes::EMPTY_SUBJECT_ID,
            SessionError::UnknownIncident { .. } => SessionErrorCodes::UNKNOWN_INCIDENT,
            SessionError::StatePoisoned => SessionErrorCodes::STATE_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::InvalidSensitivity { value } => {
                format!(
                    "Invalid sensitivity '{}' (expected low, medium or high)",
                    value
                )
            }
            SessionError::EmptySubjectId => "Subject id must not be empty".to_string(),
            SessionError::UnknownIncident {
                subject_id,
                incident_id,
            } => {
                format!(
                    "No incident {} recorded for subject {}",
                    incident_id, subject_id
                )
            }
            SessionError::StatePoisoned => "Session state lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SessionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_codes() {
        assert_eq!(
            SessionError::InvalidSensitivity {
                value: "extreme".to_string()
            }
            .code(),
            SessionErrorCodes::INVALID_SENSITIVITY
        );
        assert_eq!(SessionError::EmptySubjectId.code(), 2002);
        assert_eq!(SessionError::StatePoisoned.code(), 2004);
    }

    #[test]
    fn test_session_error_messages() {
        let err = SessionError::InvalidSensitivity {
            value: "extreme".to_string(),
        };
        assert!(err.message().contains("extreme"));

        let err = SessionError::UnknownIncident {
            subject_id: "resident-7".to_string(),
            incident_id: 42,
        };
        assert_eq!(err.message(), "No incident 42 recorded for subject resident-7");
    }
}
