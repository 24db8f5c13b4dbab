// Managers Module
//
// Focused manager classes owned by MonitorContext.
//
// - SessionManager: monitoring sessions, admission, incident history and
//   aggregate stats

pub mod session_manager;

pub use session_manager::{subject_key, Admission, AggregateStats, LaneTurn, SessionManager};
