//! Error types for the workchain crate.
//!
//! Stage-level execution failures belong to the execution engine. The
//! orchestrator only sees them as terminal records and surfaces them through
//! [`WorkflowError::StageFailed`]; it never retries a stage itself.

use crate::core::{ActionId, StageKind, WorkState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for workchain operations.
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    /// A stage reached a terminal state other than success.
    #[error("Stage '{stage}' finished as {state}")]
    StageFailed {
        /// The stage that failed.
        stage: StageKind,
        /// The terminal state reported by the engine.
        state: WorkState,
    },

    /// A notification action could not be started.
    #[error("{0}")]
    ActionLaunch(#[from] ActionLaunchError),

    /// `start` was called on an orchestrator that already has a run.
    #[error("Workflow already started for identity '{0}'")]
    AlreadyStarted(String),

    /// The engine does not know the given handle.
    #[error("Unknown work handle: {0}")]
    UnknownHandle(String),

    /// A chain was submitted with no requests.
    #[error("Cannot submit an empty chain")]
    EmptyChain,

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error, kept as a message so the error stays cloneable.
    #[error("IO error: {0}")]
    Io(String),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    /// Returns a stable error code for reporting.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::StageFailed { .. } => "WORKFLOW-STAGE-FAILED",
            Self::ActionLaunch(_) => "WORKFLOW-ACTION-LAUNCH",
            Self::AlreadyStarted(_) => "WORKFLOW-ALREADY-STARTED",
            Self::UnknownHandle(_) => "ENGINE-UNKNOWN-HANDLE",
            Self::EmptyChain => "ENGINE-EMPTY-CHAIN",
            Self::Config(_) => "CONFIG-INVALID",
            Self::Serialization(_) => "SERIALIZATION",
            Self::Io(_) => "IO",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Converts to a dictionary representation for event payloads.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        match self {
            Self::StageFailed { stage, state } => {
                map.insert("stage".to_string(), serde_json::json!(stage));
                map.insert("state".to_string(), serde_json::json!(state));
            }
            Self::ActionLaunch(err) => {
                map.insert("action".to_string(), serde_json::json!(err.action()));
            }
            _ => {}
        }
        map
    }
}

impl From<std::io::Error> for WorkflowError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Error raised when a notification action fails to start.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ActionLaunchError {
    /// No action is registered under the identifier.
    #[error("Notification action {0} is not registered")]
    NotRegistered(ActionId),

    /// There is no async runtime to host the action.
    #[error("Notification action {0} cannot start: no runtime available")]
    RuntimeUnavailable(ActionId),

    /// The host refused to start the action.
    #[error("Notification action {action} rejected: {reason}")]
    Rejected {
        /// The action that was rejected.
        action: ActionId,
        /// Why it was rejected.
        reason: String,
    },
}

impl ActionLaunchError {
    /// Creates a rejection error.
    #[must_use]
    pub fn rejected(action: ActionId, reason: impl Into<String>) -> Self {
        Self::Rejected {
            action,
            reason: reason.into(),
        }
    }

    /// Returns the action that failed to launch.
    #[must_use]
    pub fn action(&self) -> ActionId {
        match self {
            Self::NotRegistered(action) | Self::RuntimeUnavailable(action) => *action,
            Self::Rejected { action, .. } => *action,
        }
    }
}
