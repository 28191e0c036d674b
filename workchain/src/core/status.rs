//! Stage kinds, notification action identifiers and work states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The stages of the workflow.
///
/// The set is closed: a stage that is not listed here cannot be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageKind {
    /// The first stage, chained ahead of the second.
    #[serde(rename = "stage1")]
    First,
    /// The second stage, which runs only after the first has finished.
    #[serde(rename = "stage2")]
    Second,
    /// The third stage, submitted after notification action A signals.
    #[serde(rename = "stage3")]
    Third,
}

impl StageKind {
    /// All stages in workflow order.
    pub const ALL: [Self; 3] = [Self::First, Self::Second, Self::Third];

    /// Returns the payload key a worker of this kind reads its identity from.
    #[must_use]
    pub const fn input_key(self) -> &'static str {
        match self {
            Self::First => "first.id",
            Self::Second => "second.id",
            Self::Third => "third.id",
        }
    }

    /// Returns the payload key a worker of this kind writes its result under.
    #[must_use]
    pub const fn output_key(self) -> &'static str {
        match self {
            Self::First => "first.out",
            Self::Second => "second.out",
            Self::Third => "third.out",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "stage1"),
            Self::Second => write!(f, "stage2"),
            Self::Third => write!(f, "stage3"),
        }
    }
}

/// Identifies an out-of-band notification action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionId {
    /// Launched after stage 2; its signal releases stage 3.
    A,
    /// Launched after stage 3; its signal ends the workflow.
    B,
}

impl ActionId {
    /// Both actions in launch order.
    pub const ALL: [Self; 2] = [Self::A, Self::B];
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// Lifecycle state of a submitted stage request, as published by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkState {
    /// Accepted and waiting to run.
    Enqueued,
    /// Waiting on a predecessor or an unmet constraint.
    Blocked,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Finished unsuccessfully.
    Failed,
    /// Finished without running to completion.
    Cancelled,
}

impl Default for WorkState {
    fn default() -> Self {
        Self::Enqueued
    }
}

impl fmt::Display for WorkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enqueued => write!(f, "enqueued"),
            Self::Blocked => write!(f, "blocked"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl WorkState {
    /// Returns true if the state is terminal.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Returns true if the state indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}
