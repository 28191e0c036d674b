//! Worker trait and implementations.
//!
//! Workers perform the actual computation of a stage. The engine runs them;
//! the orchestrator never sees them.

use crate::core::{StageKind, WorkData};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Result of one worker run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkResult {
    /// The work finished; the payload becomes the record's output.
    Success(WorkData),
    /// The work hit a transient problem and should run again later.
    Retry,
    /// The work failed permanently.
    Failure(String),
}

impl WorkResult {
    /// A success with no output.
    #[must_use]
    pub fn success() -> Self {
        Self::Success(WorkData::empty())
    }

    /// A permanent failure.
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure(reason.into())
    }
}

/// Trait for stage workers.
#[async_trait]
pub trait Worker: Send + Sync + Debug {
    /// Runs the work for one request.
    ///
    /// # Arguments
    ///
    /// * `input` - The request's input payload
    async fn do_work(&self, input: &WorkData) -> WorkResult;
}

/// A simple function-based worker.
pub struct FnWorker<F>
where
    F: Fn(&WorkData) -> WorkResult + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnWorker<F>
where
    F: Fn(&WorkData) -> WorkResult + Send + Sync,
{
    /// Creates a new function-based worker.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnWorker<F>
where
    F: Fn(&WorkData) -> WorkResult + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnWorker").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Worker for FnWorker<F>
where
    F: Fn(&WorkData) -> WorkResult + Send + Sync,
{
    async fn do_work(&self, input: &WorkData) -> WorkResult {
        (self.func)(input)
    }
}

/// Sleeps for a fixed duration, then echoes the identity to its output key.
#[derive(Debug, Clone)]
pub struct SimulatedWorker {
    kind: StageKind,
    duration: Duration,
}

impl SimulatedWorker {
    /// Creates a simulated worker.
    #[must_use]
    pub fn new(kind: StageKind, duration: Duration) -> Self {
        Self { kind, duration }
    }
}

#[async_trait]
impl Worker for SimulatedWorker {
    async fn do_work(&self, input: &WorkData) -> WorkResult {
        let Some(identity) = input.get(self.kind.input_key()) else {
            return WorkResult::failure(format!(
                "missing input '{}'",
                self.kind.input_key()
            ));
        };
        debug!(stage = %self.kind, identity, duration_ms = self.duration.as_millis() as u64, "Simulating work");
        tokio::time::sleep(self.duration).await;
        WorkResult::Success(WorkData::single(self.kind.output_key(), identity))
    }
}

/// Workers keyed by the stage they perform.
#[derive(Debug, Clone, Default)]
pub struct WorkerRegistry {
    workers: HashMap<StageKind, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with a [`SimulatedWorker`] for every stage.
    #[must_use]
    pub fn simulated(duration: Duration) -> Self {
        StageKind::ALL.iter().fold(Self::new(), |registry, &kind| {
            registry.with_worker(kind, Arc::new(SimulatedWorker::new(kind, duration)))
        })
    }

    /// Registers a worker, replacing any previous one for the stage.
    #[must_use]
    pub fn with_worker(mut self, kind: StageKind, worker: Arc<dyn Worker>) -> Self {
        self.workers.insert(kind, worker);
        self
    }

    /// Looks up the worker for a stage.
    #[must_use]
    pub fn get(&self, kind: StageKind) -> Option<Arc<dyn Worker>> {
        self.workers.get(&kind).cloned()
    }

    /// Returns the number of registered workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_worker() {
        let worker = FnWorker::new("echo", |input: &WorkData| {
            WorkResult::Success(input.clone())
        });
        let input = WorkData::single("first.id", "001");
        assert_eq!(worker.do_work(&input).await, WorkResult::Success(input));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_worker_echoes_identity() {
        let worker = SimulatedWorker::new(StageKind::First, Duration::from_millis(10));
        let result = worker.do_work(&WorkData::single("first.id", "001")).await;
        assert_eq!(result, WorkResult::Success(WorkData::single("first.out", "001")));
    }

    #[tokio::test]
    async fn test_simulated_worker_missing_input() {
        let worker = SimulatedWorker::new(StageKind::Second, Duration::ZERO);
        let result = worker.do_work(&WorkData::single("first.id", "001")).await;
        assert!(matches!(result, WorkResult::Failure(_)));
    }

    #[test]
    fn test_simulated_registry_covers_all_stages() {
        let registry = WorkerRegistry::simulated(Duration::from_millis(1));
        assert_eq!(registry.len(), 3);
        assert!(StageKind::ALL.iter().all(|k| registry.get(*k).is_some()));
    }
}
