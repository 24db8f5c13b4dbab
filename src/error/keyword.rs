// Keyword catalogue error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Keyword error code constants
///
/// Error code range: 4001-4002
pub struct KeywordErrorCodes {}

impl KeywordErrorCodes {
    /// Keyword was empty after trimming
    pub const EMPTY_KEYWORD: i32 = 4001;

    /// Catalogue lock was poisoned
    pub const LOCK_POISONED: i32 = 4002;
}

/// Log a keyword catalogue error with structured context
pub fn log_keyword_error(err: &KeywordError, context: &str) {
    error!(
        "Keyword error in {}: code={}, component=KeywordCatalogue, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors rejected by the distress keyword catalogue
#[derive(Debug, Clone, PartialEq)]
pub enum KeywordError {
    /// Keyword was empty or whitespace
    EmptyKeyword,

    /// Catalogue lock was poisoned
    LockPoisoned,
}

impl ErrorCode for KeywordError {
    fn code(&self) -> i32 {
        match self {
            KeywordError::EmptyKeyword => KeywordErrorCodes::EMPTY_KEYWORD,
            KeywordError::LockPoisoned => KeywordErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            KeywordError::EmptyKeyword => "Keyword must not be empty".to_string(),
            KeywordError::LockPoisoned => "Keyword catalogue lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for KeywordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KeywordError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for KeywordError {}
