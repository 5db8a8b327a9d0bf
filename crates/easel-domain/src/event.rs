use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::ports::EventPort;

pub const OBJECT_ADDED: &str = "object.added";
pub const OBJECT_UPDATED: &str = "object.updated";
pub const OBJECT_REMOVED: &str = "object.removed";
pub const OBJECT_REORDERED: &str = "object.reordered";
pub const OBJECTS_GROUPED: &str = "objects.grouped";
pub const OBJECT_UNGROUPED: &str = "object.ungrouped";
pub const TEXT_EDITED: &str = "text.edited";
pub const CLIPBOARD_CHANGED: &str = "clipboard.changed";
pub const SELECTION_CHANGED: &str = "selection.changed";

/// Immutable fact about a mutation that already happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: Uuid,
    pub event_type: String,
    pub aggregate_id: String,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

impl DomainEvent {
    pub fn new(event_type: &str, aggregate_id: impl Into<String>, data: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            aggregate_id: aggregate_id.into(),
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Event port that keeps everything it receives, in order.
#[derive(Debug, Default)]
pub struct RecordingEventBus {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventPort for RecordingEventBus {
    fn emit(&self, event: DomainEvent) {
        tracing::trace!("Event {} on {}", event.event_type, event.aggregate_id);
        self.events.lock().push(event);
    }
}
