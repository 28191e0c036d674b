//! Snapshots published by the execution engine and the signal bus.

use super::{ActionId, WorkData, WorkState};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque handle to a request accepted by an execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(Uuid);

impl Handle {
    /// Wraps an engine-assigned id.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A status snapshot for one submitted request.
///
/// Engines publish one of these on every status change and may publish the
/// same finished snapshot more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// The request the snapshot belongs to.
    pub handle: Handle,
    /// Current state.
    pub state: WorkState,
    /// Worker output, present once the request succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<WorkData>,
}

impl CompletionRecord {
    /// Creates a snapshot without output.
    #[must_use]
    pub fn new(handle: Handle, state: WorkState) -> Self {
        Self {
            handle,
            state,
            output: None,
        }
    }

    /// Creates a successful snapshot carrying worker output.
    #[must_use]
    pub fn succeeded(handle: Handle, output: WorkData) -> Self {
        Self {
            handle,
            state: WorkState::Succeeded,
            output: Some(output),
        }
    }

    /// Returns true if the request reached a terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Returns the terminal state, or `None` while still in flight.
    #[must_use]
    pub fn outcome(&self) -> Option<WorkState> {
        self.is_finished().then_some(self.state)
    }
}

/// Broadcast by a notification action when it has finished its work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSignal {
    /// The action that finished.
    pub action: ActionId,
    /// The identity the action was launched with.
    pub identity: String,
    /// RFC 3339 emission time.
    pub emitted_at: String,
}

impl CompletionSignal {
    /// Creates a signal stamped with the current time.
    #[must_use]
    pub fn new(action: ActionId, identity: impl Into<String>) -> Self {
        Self {
            action,
            identity: identity.into(),
            emitted_at: super::event::iso_timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_only_when_finished() {
        let handle = Handle::new(Uuid::new_v4());
        assert_eq!(CompletionRecord::new(handle, WorkState::Running).outcome(), None);
        assert_eq!(
            CompletionRecord::new(handle, WorkState::Failed).outcome(),
            Some(WorkState::Failed)
        );
    }

    #[test]
    fn test_succeeded_carries_output() {
        let handle = Handle::new(Uuid::new_v4());
        let record = CompletionRecord::succeeded(handle, WorkData::single("first.out", "001"));
        assert!(record.is_finished());
        assert_eq!(record.output.unwrap().get("first.out"), Some("001"));
    }
}
