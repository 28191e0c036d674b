//! Workflow notices emitted as each step completes.

use super::{ActionId, StageKind};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Returns the current UTC time as an RFC 3339 string with microseconds.
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// A short, human-readable notice about workflow progress.
///
/// Events are consumed by event sinks for logging, display or tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// The event type (e.g., "stage.done", "action.executed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event occurred (ISO 8601).
    pub timestamp: String,

    /// The user-visible message.
    pub message: String,

    /// The event payload data.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl WorkflowEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(event_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: iso_timestamp(),
            message: message.into(),
            data: HashMap::new(),
        }
    }

    /// Adds a data field to the event.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Creates a "stage.done" event.
    #[must_use]
    pub fn stage_done(stage: StageKind) -> Self {
        Self::new("stage.done", format!("{stage} done"))
            .add_data("stage", serde_json::json!(stage))
    }

    /// Creates an "action.executed" event.
    #[must_use]
    pub fn action_executed(action: ActionId, identity: &str) -> Self {
        Self::new("action.executed", format!("notification {action} executed"))
            .add_data("action", serde_json::json!(action))
            .add_data("identity", serde_json::json!(identity))
    }
}
