//! Domain event system: decoupled communication between bounded contexts.
//!
//! Events are published when a turn completes, a profile changes, or a
//! teacher override is applied. Other components (analytics, logging sinks)
//! subscribe without coupling to the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A student turn was fully processed
    TurnCompleted {
        student_id: String,
        session_id: String,
        topics: Vec<String>,
        tools_used: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A profile was persisted with new progress
    ProfileUpdated {
        student_id: String,
        level: String,
        progress: u8,
        timestamp: DateTime<Utc>,
    },

    /// A teacher replaced the tutor reply
    TeacherOverrideApplied {
        student_id: String,
        session_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A web search ran for a turn
    SearchPerformed {
        query_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// An error occurred
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::ProfileUpdated {
            student_id: "alice".into(),
            level: "Beginner".into(),
            progress: 10,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::ProfileUpdated { student_id, progress, .. } => {
                assert_eq!(student_id, "alice");
                assert_eq!(*progress, 10);
            }
            _ => panic!("Expected ProfileUpdated event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::ErrorOccurred {
            context: "test".into(),
            error_message: "no subscribers".into(),
            timestamp: Utc::now(),
        });
    }
}
