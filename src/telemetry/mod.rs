//! Monitor telemetry collector.
//!
//! The collector multiplexes detection, session, degradation and model
//! events into a bounded history plus an async broadcast stream. Each
//! `MonitorContext` owns its own collector.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

pub mod events;

pub use events::MonitorEvent;

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MonitorEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of events.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MonitorEvent>,
    history: Mutex<VecDeque<MonitorEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MonitorEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if self.history_capacity > 0 {
            let mut history = self.lock_history();
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        // No subscribers is not an error
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }

    /// Event stream for async consumers; lagged events are skipped
    pub fn stream(&self) -> impl Stream<Item = MonitorEvent> + Send + 'static {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|event| match event {
            Ok(event) => Some(event),
            Err(err) => {
                log::warn!("[Telemetry] Subscriber lagged: {}", err);
                None
            }
        })
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = self.lock_history();
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }

    /// History holds plain values, so a poisoned lock is still usable
    fn lock_history(&self) -> MutexGuard<'_, VecDeque<MonitorEvent>> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;

    fn session_event(subject: &str) -> MonitorEvent {
        MonitorEvent::SessionChanged {
            subject_id: subject.to_string(),
            state: SessionState::Active,
            sensitivity: None,
        }
    }

    #[test]
    fn collector_preserves_order_within_history() {
        let collector = TelemetryCollector::new(8, 3);
        collector.publish(session_event("a"));
        collector.publish(session_event("b"));
        collector.publish(MonitorEvent::Error {
            code: 1003,
            context: "test".to_string(),
        });

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 3);
        assert_eq!(snapshot.recent[0].subject_id(), Some("a"));
        assert!(matches!(snapshot.recent[2], MonitorEvent::Error { .. }));
    }

    #[test]
    fn collector_drops_history_when_full() {
        let collector = TelemetryCollector::new(8, 2);
        for subject in ["a", "b", "c"] {
            collector.publish(session_event(subject));
        }

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 2);
        assert_eq!(snapshot.total_events, 3);
        assert_eq!(snapshot.dropped_events, 1);
        assert_eq!(snapshot.recent[0].subject_id(), Some("b"));
    }

    #[tokio::test]
    async fn stream_delivers_published_events() {
        let collector = TelemetryCollector::new(8, 8);
        let mut stream = Box::pin(collector.stream());

        collector.publish(session_event("resident-1"));
        collector.publish(MonitorEvent::ModelSwapped {
            model_type: None,
            version: None,
        });

        let first = stream.next().await.unwrap();
        let second = stream.next().await.unwrap();
        assert_eq!(first.subject_id(), Some("resident-1"));
        assert!(matches!(second, MonitorEvent::ModelSwapped { .. }));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_string(&session_event("x")).unwrap();
        assert!(json.contains("\"type\":\"session_changed\""));
        assert!(json.contains("\"state\":\"active\""));
    }
}
