//! In-process execution engine backed by tokio tasks.

use super::{CompletionReceiver, ExecutionEngine, NetworkMonitor, RetryConfig, WorkResult, WorkerRegistry};
use crate::core::{CompletionRecord, Handle, StageKind, WorkState};
use crate::errors::WorkflowError;
use crate::request::StageRequest;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug)]
struct Tracker {
    kind: StageKind,
    latest: CompletionRecord,
    observers: Vec<mpsc::UnboundedSender<CompletionRecord>>,
    observed: bool,
}

impl Tracker {
    /// Finished, and everyone who ever observed it has gone away.
    fn is_stale(&self) -> bool {
        self.observed && self.latest.is_finished() && self.observers.iter().all(|tx| tx.is_closed())
    }
}

#[derive(Debug)]
struct EngineInner {
    workers: WorkerRegistry,
    network: NetworkMonitor,
    retry: RetryConfig,
    trackers: DashMap<Handle, Tracker>,
}

/// Runs stage requests on the ambient tokio runtime.
///
/// Requests wait for their constraints, run their stage's worker and retry
/// with backoff when the worker asks to. Chains run sequentially in one task.
///
/// A finished request is forgotten once every receiver returned by
/// [`observe`](ExecutionEngine::observe) for it has been dropped. Requests
/// that were never observed stay queryable through [`state`](Self::state).
#[derive(Debug, Clone)]
pub struct LocalEngine {
    inner: Arc<EngineInner>,
}

impl LocalEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(workers: WorkerRegistry, network: NetworkMonitor, retry: RetryConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                workers,
                network,
                retry,
                trackers: DashMap::new(),
            }),
        }
    }

    /// Returns the latest known state of a request.
    #[must_use]
    pub fn state(&self, handle: &Handle) -> Option<WorkState> {
        self.inner.trackers.get(handle).map(|t| t.latest.state)
    }

    /// Returns the number of requests the engine has accepted.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.inner.trackers.len()
    }

    fn runtime() -> Result<tokio::runtime::Handle, WorkflowError> {
        tokio::runtime::Handle::try_current()
            .map_err(|e| WorkflowError::Internal(format!("No tokio runtime for engine: {e}")))
    }
}

impl EngineInner {
    fn prune(&self) {
        let before = self.trackers.len();
        self.trackers.retain(|_, tracker| !tracker.is_stale());
        let pruned = before.saturating_sub(self.trackers.len());
        if pruned > 0 {
            debug!(pruned, "Forgot finished work");
        }
    }

    fn register(&self, request: &StageRequest, state: WorkState) -> Handle {
        let handle = Handle::new(request.id());
        self.trackers.insert(
            handle,
            Tracker {
                kind: request.kind(),
                latest: CompletionRecord::new(handle, state),
                observers: Vec::new(),
                observed: false,
            },
        );
        handle
    }

    fn publish(&self, record: CompletionRecord) {
        let stale = match self.trackers.get_mut(&record.handle) {
            Some(mut tracker) => {
                debug!(stage = %tracker.kind, handle = %record.handle, state = %record.state, "Work state changed");
                tracker.latest = record.clone();
                tracker.observers.retain(|tx| tx.send(record.clone()).is_ok());
                tracker.is_stale()
            }
            None => false,
        };
        if stale {
            self.trackers.remove_if(&record.handle, |_, tracker| tracker.is_stale());
        }
    }

    fn set_state(&self, handle: Handle, state: WorkState) {
        self.publish(CompletionRecord::new(handle, state));
    }

    async fn run(&self, request: &StageRequest) -> WorkState {
        let handle = Handle::new(request.id());
        let kind = request.kind();

        let Some(worker) = self.workers.get(kind) else {
            error!(stage = %kind, handle = %handle, "No worker registered for stage");
            self.set_state(handle, WorkState::Failed);
            return WorkState::Failed;
        };

        let mut backoff = self.retry.backoff();

        loop {
            if !self.network.is_satisfied(request.constraints()) {
                info!(stage = %kind, network = %request.constraints().network, "Waiting for constraints");
                self.set_state(handle, WorkState::Blocked);
                self.network.wait_until_satisfied(request.constraints()).await;
            }

            self.set_state(handle, WorkState::Running);

            match worker.do_work(request.input()).await {
                WorkResult::Success(output) => {
                    info!(stage = %kind, handle = %handle, "Work succeeded");
                    self.publish(CompletionRecord::succeeded(handle, output));
                    return WorkState::Succeeded;
                }
                WorkResult::Failure(reason) => {
                    warn!(stage = %kind, handle = %handle, reason = %reason, "Work failed");
                    self.set_state(handle, WorkState::Failed);
                    return WorkState::Failed;
                }
                WorkResult::Retry => match backoff.next_delay() {
                    Some(delay) => {
                        debug!(
                            stage = %kind,
                            rerun = backoff.reruns(),
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "Retrying work"
                        );
                        self.set_state(handle, WorkState::Enqueued);
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        warn!(stage = %kind, handle = %handle, runs = backoff.runs(), "Retries exhausted");
                        self.set_state(handle, WorkState::Failed);
                        return WorkState::Failed;
                    }
                },
            }
        }
    }
}

impl ExecutionEngine for LocalEngine {
    fn submit(&self, request: StageRequest) -> Result<Handle, WorkflowError> {
        let runtime = Self::runtime()?;
        self.inner.prune();
        let handle = self.inner.register(&request, WorkState::Enqueued);
        info!(stage = %request.kind(), handle = %handle, "Submitted work");

        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            inner.run(&request).await;
        });
        Ok(handle)
    }

    fn submit_chain(&self, requests: Vec<StageRequest>) -> Result<Vec<Handle>, WorkflowError> {
        if requests.is_empty() {
            return Err(WorkflowError::EmptyChain);
        }
        let runtime = Self::runtime()?;
        self.inner.prune();

        let handles: Vec<Handle> = requests
            .iter()
            .enumerate()
            .map(|(i, request)| {
                let state = if i == 0 {
                    WorkState::Enqueued
                } else {
                    WorkState::Blocked
                };
                self.inner.register(request, state)
            })
            .collect();
        info!(
            stages = ?requests.iter().map(StageRequest::kind).collect::<Vec<_>>(),
            "Submitted work chain"
        );

        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            let mut remaining = requests.iter();
            while let Some(request) = remaining.next() {
                let outcome = inner.run(request).await;
                if !outcome.is_success() {
                    // Dependents inherit the predecessor's terminal state.
                    for dependent in remaining.by_ref() {
                        inner.set_state(Handle::new(dependent.id()), outcome);
                    }
                    break;
                }
            }
        });
        Ok(handles)
    }

    fn observe(&self, handle: &Handle) -> Result<CompletionReceiver, WorkflowError> {
        let mut tracker = self
            .inner
            .trackers
            .get_mut(handle)
            .ok_or_else(|| WorkflowError::UnknownHandle(handle.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        // Observers start from the current snapshot.
        let _ = tx.send(tracker.latest.clone());
        tracker.observers.push(tx);
        tracker.observed = true;
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WorkData;
    use crate::engine::{FnWorker, SimulatedWorker};
    use crate::request::Constraints;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    fn recording_registry(log: &Arc<Mutex<Vec<StageKind>>>) -> WorkerRegistry {
        StageKind::ALL.iter().fold(WorkerRegistry::new(), |registry, &kind| {
            let log = Arc::clone(log);
            registry.with_worker(
                kind,
                Arc::new(FnWorker::new(kind.to_string(), move |_input: &WorkData| {
                    log.lock().push(kind);
                    WorkResult::success()
                })),
            )
        })
    }

    async fn wait_finished(rx: &mut CompletionReceiver) -> CompletionRecord {
        loop {
            let record = rx.recv().await.expect("engine dropped observer");
            if record.is_finished() {
                return record;
            }
        }
    }

    fn request(kind: StageKind, constraints: Constraints) -> StageRequest {
        StageRequest::for_identity(kind, constraints, "001")
    }

    #[tokio::test]
    async fn test_chain_runs_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let engine = LocalEngine::new(
            recording_registry(&log),
            NetworkMonitor::online(),
            RetryConfig::default(),
        );

        let handles = engine
            .submit_chain(vec![
                request(StageKind::First, Constraints::none()),
                request(StageKind::Second, Constraints::none()),
            ])
            .unwrap();
        let mut second = engine.observe(&handles[1]).unwrap();

        let record = wait_finished(&mut second).await;
        assert_eq!(record.state, WorkState::Succeeded);
        assert_eq!(*log.lock(), vec![StageKind::First, StageKind::Second]);
        assert_eq!(engine.state(&handles[0]), Some(WorkState::Succeeded));
    }

    #[tokio::test]
    async fn test_empty_chain_rejected() {
        let engine = LocalEngine::new(
            WorkerRegistry::new(),
            NetworkMonitor::online(),
            RetryConfig::default(),
        );
        assert!(matches!(
            engine.submit_chain(Vec::new()),
            Err(WorkflowError::EmptyChain)
        ));
    }

    #[tokio::test]
    async fn test_observe_unknown_handle() {
        let engine = LocalEngine::new(
            WorkerRegistry::new(),
            NetworkMonitor::online(),
            RetryConfig::default(),
        );
        let result = engine.observe(&Handle::new(Uuid::new_v4()));
        assert!(matches!(result, Err(WorkflowError::UnknownHandle(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_until_network_available() {
        let network = NetworkMonitor::offline();
        let engine = LocalEngine::new(
            WorkerRegistry::simulated(Duration::from_millis(1)),
            network.clone(),
            RetryConfig::default(),
        );

        let handle = engine
            .submit(request(StageKind::First, Constraints::network_connected()))
            .unwrap();
        let mut rx = engine.observe(&handle).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(engine.state(&handle), Some(WorkState::Blocked));

        network.set_connected(true);
        let record = wait_finished(&mut rx).await;
        assert_eq!(record.state, WorkState::Succeeded);
        assert_eq!(record.output.unwrap().get("first.out"), Some("001"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let workers = WorkerRegistry::new().with_worker(
            StageKind::Third,
            Arc::new(FnWorker::new("flaky", move |_input: &WorkData| {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    WorkResult::Retry
                } else {
                    WorkResult::success()
                }
            })),
        );
        let retry = RetryConfig::fixed(3, Duration::from_millis(10));
        let engine = LocalEngine::new(workers, NetworkMonitor::online(), retry);

        let handle = engine.submit(request(StageKind::Third, Constraints::none())).unwrap();
        let mut rx = engine.observe(&handle).unwrap();

        assert_eq!(wait_finished(&mut rx).await.state, WorkState::Succeeded);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausted_fails() {
        let workers = WorkerRegistry::new().with_worker(
            StageKind::First,
            Arc::new(FnWorker::new("always-retry", |_input: &WorkData| WorkResult::Retry)),
        );
        let retry = RetryConfig::fixed(2, Duration::from_millis(5));
        let engine = LocalEngine::new(workers, NetworkMonitor::online(), retry);

        let handle = engine.submit(request(StageKind::First, Constraints::none())).unwrap();
        let mut rx = engine.observe(&handle).unwrap();
        assert_eq!(wait_finished(&mut rx).await.state, WorkState::Failed);
    }

    #[tokio::test]
    async fn test_failure_propagates_to_dependents() {
        let workers = WorkerRegistry::new()
            .with_worker(
                StageKind::First,
                Arc::new(FnWorker::new("broken", |_input: &WorkData| {
                    WorkResult::failure("disk full")
                })),
            )
            .with_worker(
                StageKind::Second,
                Arc::new(SimulatedWorker::new(StageKind::Second, Duration::ZERO)),
            );
        let engine = LocalEngine::new(workers, NetworkMonitor::online(), RetryConfig::default());

        let handles = engine
            .submit_chain(vec![
                request(StageKind::First, Constraints::none()),
                request(StageKind::Second, Constraints::none()),
            ])
            .unwrap();
        let mut second = engine.observe(&handles[1]).unwrap();

        assert_eq!(wait_finished(&mut second).await.state, WorkState::Failed);
        assert_eq!(engine.state(&handles[0]), Some(WorkState::Failed));
    }

    #[tokio::test]
    async fn test_missing_worker_fails() {
        let engine = LocalEngine::new(
            WorkerRegistry::new(),
            NetworkMonitor::online(),
            RetryConfig::default(),
        );
        let handle = engine.submit(request(StageKind::Second, Constraints::none())).unwrap();
        let mut rx = engine.observe(&handle).unwrap();
        assert_eq!(wait_finished(&mut rx).await.state, WorkState::Failed);
    }

    #[tokio::test]
    async fn test_finished_work_forgotten_after_observers_drop() {
        let engine = LocalEngine::new(
            WorkerRegistry::simulated(Duration::ZERO),
            NetworkMonitor::online(),
            RetryConfig::default(),
        );

        let first = engine.submit(request(StageKind::First, Constraints::none())).unwrap();
        let mut rx = engine.observe(&first).unwrap();
        assert_eq!(wait_finished(&mut rx).await.state, WorkState::Succeeded);
        assert_eq!(engine.state(&first), Some(WorkState::Succeeded));
        drop(rx);

        let unobserved = engine.submit(request(StageKind::Second, Constraints::none())).unwrap();
        assert_eq!(engine.state(&first), None);
        assert!(matches!(engine.observe(&first), Err(WorkflowError::UnknownHandle(_))));

        let third = engine.submit(request(StageKind::Third, Constraints::none())).unwrap();
        let mut rx = engine.observe(&third).unwrap();
        wait_finished(&mut rx).await;
        assert!(engine.state(&unobserved).is_some());
        assert_eq!(engine.tracked_count(), 2);
    }

    #[test]
    fn test_submit_without_runtime_errors() {
        let engine = LocalEngine::new(
            WorkerRegistry::new(),
            NetworkMonitor::online(),
            RetryConfig::default(),
        );
        let result = engine.submit(request(StageKind::First, Constraints::none()));
        assert!(matches!(result, Err(WorkflowError::Internal(_))));
        assert_eq!(engine.tracked_count(), 0);
    }
}
