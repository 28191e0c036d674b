//! Task execution engine.
//!
//! This module provides:
//! - The [`ExecutionEngine`] seam the orchestrator submits work through
//! - An in-process engine with constraint gating, chaining and retry
//! - Workers, connectivity tracking and backoff policy

mod local;
mod network;
mod retry;
mod worker;

pub use local::LocalEngine;
pub use network::{NetworkMonitor, NetworkStatus};
pub use retry::{Backoff, BackoffStrategy, JitterStrategy, RetryConfig};
pub use worker::{FnWorker, SimulatedWorker, WorkResult, Worker, WorkerRegistry};

use crate::core::{CompletionRecord, Handle};
use crate::errors::WorkflowError;
use crate::request::StageRequest;
use tokio::sync::mpsc;

/// Stream of status snapshots for one handle.
pub type CompletionReceiver = mpsc::UnboundedReceiver<CompletionRecord>;

/// Accepts stage requests and reports their progress.
///
/// Every method must return without waiting for work to run.
pub trait ExecutionEngine: Send + Sync {
    /// Enqueues a single request.
    fn submit(&self, request: StageRequest) -> Result<Handle, WorkflowError>;

    /// Enqueues an ordered, dependent sequence.
    ///
    /// Request N+1 must not start executing before request N has finished
    /// successfully. Handles are returned in request order.
    fn submit_chain(&self, requests: Vec<StageRequest>) -> Result<Vec<Handle>, WorkflowError>;

    /// Subscribes to status changes for a handle.
    ///
    /// The receiver may yield the same finished snapshot more than once.
    fn observe(&self, handle: &Handle) -> Result<CompletionReceiver, WorkflowError>;
}
