// SessionManager: per-subject monitoring sessions and incident history
//
// Single Responsibility: session state machine, admission snapshots and
// incident recording
//
// Locking:
// - the session map is an RwLock held only long enough to find or insert a
//   subject's entry
// - each session has its own Mutex, so mutations for one subject are
//   serialized without blocking other subjects
// - each subject has a FIFO processing lane (tokio Mutex) that keeps that
//   subject's clips in arrival order; a lane lives only while a clip holds
//   or waits for it
//
// Subject ids are trimmed on every entry point, so " bob " and "bob" name
// the same subject.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{log_session_error, SessionError};
use crate::session::{
    Incident, IncidentLog, MonitoringSession, NewIncident, Sensitivity, SessionSnapshot,
    Thresholds,
};

type SessionSlot = Arc<Mutex<MonitoringSession>>;
type Lane = Arc<tokio::sync::Mutex<()>>;
type LaneMap = Mutex<HashMap<String, Lane>>;

/// Session facts captured when a clip is admitted
///
/// Processing uses these values even if the session changes mid-flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Admission {
    /// Whether a confirmed fall from this clip is logged
    pub logging: bool,
    pub thresholds: Thresholds,
}

/// Aggregate counters across all subjects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub active_sessions: usize,
    pub total_falls: u64,
    pub model_loaded: bool,
    pub subjects_tracked: usize,
}

#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionSlot>>,
    lanes: LaneMap,
    incidents: IncidentLog,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start or restart monitoring a subject
    ///
    /// Restarting replaces sensitivity, thresholds and timestamps wholesale
    /// and keeps the fall count.
    ///
    /// # Errors
    /// * `SessionError::EmptySubjectId` - blank subject id
    /// * `SessionError::StatePoisoned` - lock poisoning
    pub fn start(
        &self,
        subject_id: &str,
        sensitivity: Sensitivity,
    ) -> Result<SessionSnapshot, SessionError> {
        let subject_id = validate_subject(subject_id)?;

        let slot = {
            let mut sessions = self.write_sessions()?;
            match sessions.get(subject_id) {
                Some(slot) => Arc::clone(slot),
                None => {
                    let session = MonitoringSession::start(subject_id, sensitivity, 0);
                    let snapshot = session.snapshot();
                    sessions.insert(subject_id.to_string(), Arc::new(Mutex::new(session)));
                    log::info!(
                        "[SessionManager] Started monitoring {} at {} sensitivity",
                        subject_id,
                        sensitivity
                    );
                    return Ok(snapshot);
                }
            }
        };

        let mut session = lock_session(&slot)?;
        *session = MonitoringSession::start(subject_id, sensitivity, session.fall_count());
        log::info!(
            "[SessionManager] Restarted monitoring {} at {} sensitivity",
            subject_id,
            sensitivity
        );
        Ok(session.snapshot())
    }

    /// Stop monitoring a subject
    ///
    /// # Returns
    /// true if the subject was being monitored; unknown or already stopped
    /// subjects are a no-op
    pub fn stop(&self, subject_id: &str) -> Result<bool, SessionError> {
        let subject_id = subject_key(subject_id);
        let Some(slot) = self.slot(subject_id)? else {
            return Ok(false);
        };
        let stopped = lock_session(&slot)?.stop();
        if stopped {
            log::info!("[SessionManager] Stopped monitoring {}", subject_id);
        }
        Ok(stopped)
    }

    /// Current session view; unknown subjects report not-monitoring
    pub fn status(&self, subject_id: &str) -> Result<SessionSnapshot, SessionError> {
        let subject_id = subject_key(subject_id);
        match self.slot(subject_id)? {
            Some(slot) => Ok(lock_session(&slot)?.snapshot()),
            None => Ok(SessionSnapshot::not_monitoring(subject_id)),
        }
    }

    /// Capture logging eligibility and thresholds for a newly arrived clip
    ///
    /// Subjects without an active session are evaluated with the thresholds
    /// of `fallback` and are never logged.
    pub fn admit(&self, subject_id: &str, fallback: Sensitivity) -> Result<Admission, SessionError> {
        let subject_id = subject_key(subject_id);
        if let Some(slot) = self.slot(subject_id)? {
            let session = lock_session(&slot)?;
            if session.is_active() {
                return Ok(Admission {
                    logging: true,
                    thresholds: session.thresholds(),
                });
            }
        }

        Ok(Admission {
            logging: false,
            thresholds: fallback.thresholds(),
        })
    }

    /// Wait for a subject's turn in its FIFO lane
    ///
    /// Holding the returned turn for the whole of a clip's processing keeps
    /// one subject's clips in arrival order while other subjects proceed.
    /// The lane is dropped from the map when the last turn for it ends.
    pub async fn enter_lane(&self, subject_id: &str) -> Result<LaneTurn<'_>, SessionError> {
        let subject_id = subject_key(subject_id);
        let lane = {
            let mut lanes = self.lock_lanes()?;
            Arc::clone(lanes.entry(subject_id.to_string()).or_default())
        };

        let guard = Arc::clone(&lane).lock_owned().await;
        Ok(LaneTurn {
            lanes: &self.lanes,
            subject_id: subject_id.to_string(),
            lane,
            guard: Some(guard),
        })
    }

    /// Number of subjects with a clip in flight
    pub fn lane_count(&self) -> Result<usize, SessionError> {
        Ok(self.lock_lanes()?.len())
    }

    /// Count a confirmed fall and append its incident
    pub fn record_fall(
        &self,
        subject_id: &str,
        incident: NewIncident,
    ) -> Result<Incident, SessionError> {
        let subject_id = subject_key(subject_id);
        if let Some(slot) = self.slot(subject_id)? {
            lock_session(&slot)?.record_fall();
        }

        let incident = self.incidents.append(subject_id, incident)?;
        log::warn!(
            "[SessionManager] Fall recorded for {} (incident {}, confidence {:.2})",
            subject_id,
            incident.id,
            incident.confidence
        );
        Ok(incident)
    }

    pub fn history(&self, subject_id: &str, limit: usize) -> Result<Vec<Incident>, SessionError> {
        self.incidents.history(subject_key(subject_id), limit)
    }

    pub fn amend_incident(
        &self,
        subject_id: &str,
        incident_id: u64,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Incident, SessionError> {
        self.incidents
            .amend(subject_key(subject_id), incident_id, metadata)
            .inspect_err(|err| log_session_error(err, "amend_incident"))
    }

    /// Aggregate counters; `model_loaded` is filled in by the caller
    pub fn stats(&self) -> Result<AggregateStats, SessionError> {
        let slots: Vec<SessionSlot> = self.read_sessions()?.values().cloned().collect();

        let mut active_sessions = 0;
        let mut total_falls = 0;
        for slot in &slots {
            let session = lock_session(slot)?;
            if session.is_active() {
                active_sessions += 1;
            }
            total_falls += session.fall_count();
        }

        Ok(AggregateStats {
            active_sessions,
            total_falls,
            model_loaded: false,
            subjects_tracked: slots.len(),
        })
    }

    // ========================================================================
    // HELPER METHODS - Lock management
    // ========================================================================

    fn slot(&self, subject_id: &str) -> Result<Option<SessionSlot>, SessionError> {
        Ok(self.read_sessions()?.get(subject_id).cloned())
    }

    fn lock_lanes(&self) -> Result<MutexGuard<'_, HashMap<String, Lane>>, SessionError> {
        self.lanes.lock().map_err(|_| SessionError::StatePoisoned)
    }

    fn read_sessions(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, SessionSlot>>, SessionError> {
        self.sessions.read().map_err(|_| SessionError::StatePoisoned)
    }

    fn write_sessions(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, SessionSlot>>, SessionError> {
        self.sessions.write().map_err(|_| SessionError::StatePoisoned)
    }
}

fn lock_session(slot: &SessionSlot) -> Result<MutexGuard<'_, MonitoringSession>, SessionError> {
    slot.lock().map_err(|_| SessionError::StatePoisoned)
}

/// A subject's turn in its processing lane
///
/// Ends when dropped; the next queued clip for the subject then runs.
pub struct LaneTurn<'a> {
    lanes: &'a LaneMap,
    subject_id: String,
    lane: Lane,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl LaneTurn<'_> {
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }
}

impl Drop for LaneTurn<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        // Lanes are only cloned under the map lock, so a count of two
        // (map entry plus this turn) means nobody else holds or awaits it
        let Ok(mut lanes) = self.lanes.lock() else {
            return;
        };
        let idle = lanes
            .get(&self.subject_id)
            .is_some_and(|lane| Arc::ptr_eq(lane, &self.lane))
            && Arc::strong_count(&self.lane) == 2;
        if idle {
            lanes.remove(&self.subject_id);
        }
    }
}

/// Canonical form of a subject id
pub fn subject_key(subject_id: &str) -> &str {
    subject_id.trim()
}

fn validate_subject(subject_id: &str) -> Result<&str, SessionError> {
    let trimmed = subject_key(subject_id);
    if trimmed.is_empty() {
        Err(SessionError::EmptySubjectId)
    } else {
        Ok(trimmed)
    }
}
