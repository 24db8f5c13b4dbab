// Monitoring session state machine
//
// NotMonitoring --start--> Active --stop--> NotMonitoring
// Restarting replaces sensitivity and thresholds wholesale; fall_count
// survives restarts and stops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sensitivity::{Sensitivity, Thresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotMonitoring,
    Active,
}

/// One subject's monitoring session
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringSession {
    subject_id: String,
    active: bool,
    sensitivity: Sensitivity,
    thresholds: Thresholds,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    fall_count: u64,
}

impl MonitoringSession {
    /// Begin an active session
    ///
    /// # Arguments
    /// * `subject_id` - Monitored subject
    /// * `sensitivity` - Tier that fixes both thresholds
    /// * `fall_count` - Falls carried over from an earlier session
    pub fn start(subject_id: &str, sensitivity: Sensitivity, fall_count: u64) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            active: true,
            sensitivity,
            thresholds: sensitivity.thresholds(),
            start_time: Utc::now(),
            end_time: None,
            fall_count,
        }
    }

    /// End the session, keeping its counters
    ///
    /// # Returns
    /// true if the session was active
    pub fn stop(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.end_time = Some(Utc::now());
        true
    }

    pub fn record_fall(&mut self) {
        self.fall_count += 1;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn fall_count(&self) -> u64 {
        self.fall_count
    }

    pub fn state(&self) -> SessionState {
        if self.active {
            SessionState::Active
        } else {
            SessionState::NotMonitoring
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            subject_id: self.subject_id.clone(),
            state: self.state(),
            sensitivity: Some(self.sensitivity),
            fall_threshold: Some(self.thresholds.fall_threshold),
            confidence_threshold: Some(self.thresholds.confidence_threshold),
            start_time: Some(self.start_time),
            end_time: self.end_time,
            fall_count: self.fall_count,
        }
    }
}

/// Point-in-time view of a subject's session
///
/// Subjects that were never monitored report `NotMonitoring` with no
/// thresholds and a zero fall count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub subject_id: String,
    pub state: SessionState,
    pub sensitivity: Option<Sensitivity>,
    pub fall_threshold: Option<f32>,
    pub confidence_threshold: Option<f32>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub fall_count: u64,
}

impl SessionSnapshot {
    pub fn not_monitoring(subject_id: &str) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            state: SessionState::NotMonitoring,
            sensitivity: None,
            fall_threshold: None,
            confidence_threshold: None,
            start_time: None,
            end_time: None,
            fall_count: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }
}
