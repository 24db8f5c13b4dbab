//! Monitor event types published to telemetry subscribers.

use serde::{Deserialize, Serialize};

use crate::analysis::classifier::ClassifierPath;
use crate::session::{Sensitivity, SessionState};

/// Events covering detections, session transitions, degradations and model swaps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MonitorEvent {
    Detection {
        subject_id: String,
        fall_detected: bool,
        confidence: f32,
        path: ClassifierPath,
        keyword_count: usize,
        processing_ms: f32,
    },
    IncidentRecorded {
        subject_id: String,
        incident_id: u64,
        confidence: f32,
    },
    SessionChanged {
        subject_id: String,
        state: SessionState,
        sensitivity: Option<Sensitivity>,
    },
    TranscriptionDegraded {
        subject_id: String,
        code: i32,
        reason: String,
    },
    /// `model_type` is None after an unload
    ModelSwapped {
        model_type: Option<String>,
        version: Option<String>,
    },
    Error {
        code: i32,
        context: String,
    },
}

impl MonitorEvent {
    /// Subject the event concerns, if any
    pub fn subject_id(&self) -> Option<&str> {
        match self {
            MonitorEvent::Detection { subject_id, .. }
            | MonitorEvent::IncidentRecorded { subject_id, .. }
            | MonitorEvent::SessionChanged { subject_id, .. }
            | MonitorEvent::TranscriptionDegraded { subject_id, .. } => Some(subject_id),
            MonitorEvent::ModelSwapped { .. } | MonitorEvent::Error { .. } => None,
        }
    }
}
