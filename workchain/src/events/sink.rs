//! Event sink trait and implementations.

use crate::core::WorkflowEvent;
use tracing::{debug, info, Level};

/// Trait for sinks that receive workflow notices.
///
/// Sinks are called from the orchestrator's event loop and must not block.
pub trait EventSink: Send + Sync {
    /// Emits an event.
    ///
    /// This method should never fail. Errors are logged but suppressed.
    fn try_emit(&self, event: &WorkflowEvent);
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn try_emit(&self, _event: &WorkflowEvent) {
        // Intentionally empty - discards all events
    }
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventSink for LoggingEventSink {
    fn try_emit(&self, event: &WorkflowEvent) {
        if self.level == Level::DEBUG {
            debug!(event_type = %event.event_type, event_data = ?event.data, "{}", event.message);
        } else {
            info!(event_type = %event.event_type, event_data = ?event.data, "{}", event.message);
        }
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<WorkflowEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.read().clone()
    }

    /// Returns the messages of all collected events, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.events.read().iter().map(|e| e.message.clone()).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<WorkflowEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn try_emit(&self, event: &WorkflowEvent) {
        self.events.write().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ActionId, StageKind};

    #[test]
    fn test_noop_and_logging_sinks() {
        let event = WorkflowEvent::stage_done(StageKind::First);
        NoOpEventSink.try_emit(&event);
        LoggingEventSink::default().try_emit(&event);
        LoggingEventSink::debug().try_emit(&event);
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.try_emit(&WorkflowEvent::stage_done(StageKind::First));
        sink.try_emit(&WorkflowEvent::action_executed(ActionId::A, "001"));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.messages(), vec!["stage1 done", "notification A executed"]);
        assert_eq!(sink.events_of_type("action.").len(), 1);
    }
}
