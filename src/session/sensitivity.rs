// Sensitivity tiers and their decision thresholds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SessionError;

/// Monitoring sensitivity tier
///
/// Higher sensitivity lowers both decision thresholds, trading false alarms
/// for fewer missed falls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    #[default]
    Medium,
    High,
}

/// Decision thresholds derived from a sensitivity tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum model probability for a fall
    pub fall_threshold: f32,
    /// Minimum rule-based score for a fall
    pub confidence_threshold: f32,
}

impl Sensitivity {
    pub const ALL: [Sensitivity; 3] = [Sensitivity::Low, Sensitivity::Medium, Sensitivity::High];

    pub fn thresholds(self) -> Thresholds {
        let (fall_threshold, confidence_threshold) = match self {
            Sensitivity::Low => (0.8, 0.7),
            Sensitivity::Medium => (0.7, 0.6),
            Sensitivity::High => (0.5, 0.4),
        };
        Thresholds {
            fall_threshold,
            confidence_threshold,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sensitivity::Low => "low",
            Sensitivity::Medium => "medium",
            Sensitivity::High => "high",
        }
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; anything but low/medium/high is rejected
impl FromStr for Sensitivity {
    type Err = SessionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Sensitivity::Low),
            "medium" => Ok(Sensitivity::Medium),
            "high" => Ok(Sensitivity::High),
            _ => Err(SessionError::InvalidSensitivity {
                value: value.to_string(),
            }),
        }
    }
}
