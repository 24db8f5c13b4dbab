// Session module - per-subject monitoring state and incident history
//
// - sensitivity: Sensitivity tiers and their threshold table
// - state: MonitoringSession state machine and SessionSnapshot
// - incident: Incident records and the append-only IncidentLog

mod incident;
mod sensitivity;
mod state;

pub use incident::{Incident, IncidentLog, NewIncident};
pub use sensitivity::{Sensitivity, Thresholds};
pub use state::{MonitoringSession, SessionSnapshot, SessionState};
