//! Workflow orchestration.
//!
//! This module provides:
//! - The explicit workflow state machine
//! - The orchestrator that drives it from engine records and action signals

mod state;
mod workflow;


pub use state::{transition, Effect, Step, WorkflowInput, WorkflowState};
pub use workflow::{WorkflowHandle, WorkflowOrchestrator};
