//! Immutable descriptions of a single unit of work.

use super::Constraints;
use crate::core::{StageKind, WorkData};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable request to run one stage.
///
/// Built once and submitted once. After submission the engine owns its
/// lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRequest {
    id: Uuid,
    kind: StageKind,
    constraints: Constraints,
    input: WorkData,
}

impl StageRequest {
    /// Starts building a request for the given stage.
    #[must_use]
    pub fn builder(kind: StageKind) -> StageRequestBuilder {
        StageRequestBuilder::new(kind)
    }

    /// Builds a request whose payload maps the stage's input key to `identity`.
    ///
    /// The payload contains exactly that one entry.
    #[must_use]
    pub fn for_identity(kind: StageKind, constraints: Constraints, identity: &str) -> Self {
        Self::builder(kind)
            .constraints(constraints)
            .input(WorkData::single(kind.input_key(), identity))
            .build()
    }

    /// Returns the engine-facing request id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the stage kind.
    #[must_use]
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// Returns the constraint descriptor.
    #[must_use]
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Returns the input payload.
    #[must_use]
    pub fn input(&self) -> &WorkData {
        &self.input
    }

    /// Returns the identity tagged in the payload, if present.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.input.get(self.kind.input_key())
    }
}

/// Builder for [`StageRequest`].
#[derive(Debug)]
pub struct StageRequestBuilder {
    kind: StageKind,
    constraints: Constraints,
    input: WorkData,
}

impl StageRequestBuilder {
    /// Creates a builder with no constraints and an empty payload.
    #[must_use]
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            constraints: Constraints::none(),
            input: WorkData::empty(),
        }
    }

    /// Sets the constraints.
    #[must_use]
    pub fn constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Sets the input payload.
    #[must_use]
    pub fn input(mut self, input: WorkData) -> Self {
        self.input = input;
        self
    }

    /// Finishes the request with a fresh id.
    #[must_use]
    pub fn build(self) -> StageRequest {
        StageRequest {
            id: Uuid::new_v4(),
            kind: self.kind,
            constraints: self.constraints,
            input: self.input,
        }
    }
}
