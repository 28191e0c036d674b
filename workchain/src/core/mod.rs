//! Core domain model types for workchain.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage kinds, action identifiers and work states
//! - Work payloads
//! - Completion records and signals
//! - Workflow notices

mod data;
pub(crate) mod event;
mod record;
mod status;

pub use data::{WorkData, WorkDataBuilder};
pub use event::{iso_timestamp, WorkflowEvent};
pub use record::{CompletionRecord, CompletionSignal, Handle};
pub use status::{ActionId, StageKind, WorkState};
