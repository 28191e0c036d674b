//! # Workchain
//!
//! Sequences a fixed chain of background stages and notification actions.
//!
//! Workchain drives one workflow per identity:
//!
//! - **Chained stages**: stages 1 and 2 are submitted to an execution engine
//!   as one ordered chain, gated on network connectivity
//! - **Signalled actions**: action A starts once stage 2 finishes, and its
//!   completion signal is what releases stage 3
//! - **Explicit state**: every step is a transition of a pure state machine,
//!   so duplicate or reordered inputs never repeat a step
//! - **Replaceable collaborators**: the engine, launcher, sinks and reporters
//!   are traits with in-process and test implementations
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use workchain::prelude::*;
//!
//! let config = WorkflowConfig::from_file("workchain.json")?;
//! let context = WorkflowContext::from_config(&config)?;
//!
//! let mut handle = context.orchestrator().start(&config.identity)?;
//! let state = handle.wait().await?;
//! assert!(state.is_completed());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod actions;
pub mod config;
pub mod context;
pub mod core;
pub mod engine;
pub mod errors;
pub mod events;
pub mod observability;
pub mod orchestrator;
pub mod request;
pub mod signal;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::actions::{
        ActionLauncher, CountdownNotification, NotificationAction, NotificationLauncher,
    };
    pub use crate::config::{LogConfig, LogFormat, WorkflowConfig};
    pub use crate::context::WorkflowContext;
    pub use crate::core::{
        ActionId, CompletionRecord, CompletionSignal, Handle, StageKind, WorkData, WorkState,
        WorkflowEvent,
    };
    pub use crate::engine::{
        ExecutionEngine, LocalEngine, NetworkMonitor, RetryConfig, WorkResult, Worker,
        WorkerRegistry,
    };
    pub use crate::errors::{ActionLaunchError, WorkflowError};
    pub use crate::events::{
        ErrorReporter, EventSink, LoggingErrorReporter, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::orchestrator::{WorkflowHandle, WorkflowOrchestrator, WorkflowState};
    pub use crate::request::{Constraints, NetworkType, StageRequest};
    pub use crate::signal::SignalBus;
}
