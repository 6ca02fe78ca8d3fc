//! Workflow event types and the EventBus
//!
//! The orchestrator owns no presentation state. Anything that renders a run
//! (progress bar, status text, result cards) subscribes to the bus instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted while a processing run advances
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowEvent {
    /// Session moved between workflow states
    StateChanged {
        session_id: Uuid,
        /// State name before the change (e.g. "IDLE")
        old_state: String,
        /// State name after the change (e.g. "UPLOADING")
        new_state: String,
        timestamp: DateTime<Utc>,
    },

    /// Progress checkpoint reached
    Progress {
        session_id: Uuid,
        /// 0-100, never lower than the previous value within a run
        percentage: u8,
        /// Short description of the current step
        operation: String,
        timestamp: DateTime<Utc>,
    },

    /// Run finished and the result bundle is available
    RunCompleted {
        session_id: Uuid,
        run_id: Option<String>,
        total_rows: u64,
        bots_count: u64,
        clean_count: u64,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Run ended in the error state
    RunFailed {
        session_id: Uuid,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl WorkflowEvent {
    /// Event type name, matching the serde tag
    pub fn event_type(&self) -> &'static str {
        match self {
            WorkflowEvent::StateChanged { .. } => "StateChanged",
            WorkflowEvent::Progress { .. } => "Progress",
            WorkflowEvent::RunCompleted { .. } => "RunCompleted",
            WorkflowEvent::RunFailed { .. } => "RunFailed",
        }
    }

    pub fn session_id(&self) -> Uuid {
        match self {
            WorkflowEvent::StateChanged { session_id, .. }
            | WorkflowEvent::Progress { session_id, .. }
            | WorkflowEvent::RunCompleted { session_id, .. }
            | WorkflowEvent::RunFailed { session_id, .. } => *session_id,
        }
    }
}

/// Broadcast channel for workflow events
///
/// Cloning is cheap; all clones share one channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WorkflowEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: WorkflowEvent,
    ) -> Result<usize, broadcast::error::SendError<WorkflowEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: WorkflowEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(session_id: Uuid, percentage: u8) -> WorkflowEvent {
        WorkflowEvent::Progress {
            session_id,
            percentage,
            operation: "test".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(10);
        assert!(bus.emit(progress(Uuid::new_v4(), 10)).is_err());
        // lossy variant must not panic
        bus.emit_lossy(progress(Uuid::new_v4(), 10));
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let id = Uuid::new_v4();

        bus.emit(progress(id, 10)).unwrap();
        bus.emit(progress(id, 30)).unwrap();

        match rx.recv().await.unwrap() {
            WorkflowEvent::Progress { percentage, .. } => assert_eq!(percentage, 10),
            other => panic!("unexpected event {:?}", other),
        }
        match rx.recv().await.unwrap() {
            WorkflowEvent::Progress { percentage, .. } => assert_eq!(percentage, 30),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(WorkflowEvent::RunFailed {
            session_id: id,
            error_message: "HTTP 500".to_string(),
            timestamp: Utc::now(),
        })
        .unwrap();

        assert_eq!(json["type"], "RunFailed");
        assert_eq!(json["error_message"], "HTTP 500");
    }

    #[test]
    fn test_event_type_and_session_id() {
        let id = Uuid::new_v4();
        let event = progress(id, 80);
        assert_eq!(event.event_type(), "Progress");
        assert_eq!(event.session_id(), id);
    }
}
