use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::commands::CommandError;
use crate::ports::{DocumentPort, EventPort, SelectionPort};
use crate::DomainEvent;

/// Ports and identity a command runs against.
///
/// Ports are optional so that a context missing one can still be built and
/// then reported on by validation instead of panicking at execution time.
#[derive(Clone)]
pub struct CommandContext {
    pub document: Option<Arc<dyn DocumentPort>>,
    pub selection: Option<Arc<dyn SelectionPort>>,
    pub events: Option<Arc<dyn EventPort>>,
    pub execution_id: String,
    pub timestamp: DateTime<Utc>,
}

impl CommandContext {
    pub fn new(
        document: Arc<dyn DocumentPort>,
        selection: Arc<dyn SelectionPort>,
        events: Arc<dyn EventPort>,
    ) -> Self {
        Self {
            document: Some(document),
            selection: Some(selection),
            events: Some(events),
            ..Self::empty()
        }
    }

    /// A context with no ports attached.
    pub fn empty() -> Self {
        Self {
            document: None,
            selection: None,
            events: None,
            execution_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_document(mut self, document: Arc<dyn DocumentPort>) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_selection(mut self, selection: Arc<dyn SelectionPort>) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventPort>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = execution_id.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Same ports, fresh execution id and timestamp.
    pub fn fork(&self) -> Self {
        Self {
            execution_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            ..self.clone()
        }
    }

    pub fn document(&self) -> Result<&Arc<dyn DocumentPort>, CommandError> {
        self.document.as_ref().ok_or_else(|| {
            CommandError::validation("MISSING_CANVAS_MANAGER", "No document port in context")
        })
    }

    pub fn selection(&self) -> Result<&Arc<dyn SelectionPort>, CommandError> {
        self.selection.as_ref().ok_or_else(|| {
            CommandError::validation("MISSING_SELECTION_MANAGER", "No selection port in context")
        })
    }

    pub fn events(&self) -> Result<&Arc<dyn EventPort>, CommandError> {
        self.events.as_ref().ok_or_else(|| {
            CommandError::validation("MISSING_EVENT_BUS", "No event port in context")
        })
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn has_events(&self) -> bool {
        self.events.is_some()
    }

    /// Emit on the event port, if there is one.
    pub fn publish(&self, event: DomainEvent) {
        match &self.events {
            Some(events) => events.emit(event),
            None => tracing::debug!("No event port, dropping {}", event.event_type),
        }
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("document", &self.document.is_some())
            .field("selection", &self.selection.is_some())
            .field("events", &self.events.is_some())
            .field("execution_id", &self.execution_id)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}
