//! Fake collaborators for driving the orchestrator deterministically.

use super::Timeline;
use crate::actions::ActionLauncher;
use crate::core::{ActionId, CompletionRecord, Handle, StageKind, WorkData, WorkState};
use crate::engine::{CompletionReceiver, ExecutionEngine};
use crate::errors::{ActionLaunchError, WorkflowError};
use crate::request::StageRequest;
use crate::signal::SignalBus;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct FakeEngineInner {
    submitted: Vec<StageRequest>,
    chains: Vec<Vec<StageKind>>,
    observers: HashMap<Handle, Vec<mpsc::UnboundedSender<CompletionRecord>>>,
}

/// An engine that never runs anything on its own.
///
/// Requests are recorded; the test decides which records are delivered, in
/// what order and how often.
#[derive(Debug, Default)]
pub struct FakeEngine {
    inner: Mutex<FakeEngineInner>,
    timeline: Timeline,
}

impl FakeEngine {
    /// Creates a fake engine with its own timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fake engine that logs deliveries to a shared timeline.
    #[must_use]
    pub fn with_timeline(timeline: Timeline) -> Self {
        Self {
            inner: Mutex::default(),
            timeline,
        }
    }

    /// Returns the timeline deliveries are logged to.
    #[must_use]
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Returns every submitted request in submission order.
    #[must_use]
    pub fn submitted(&self) -> Vec<StageRequest> {
        self.inner.lock().submitted.clone()
    }

    /// Returns how many times a stage was submitted.
    #[must_use]
    pub fn submit_count(&self, kind: StageKind) -> usize {
        self.inner
            .lock()
            .submitted
            .iter()
            .filter(|r| r.kind() == kind)
            .count()
    }

    /// Returns the stage order of every submitted chain.
    #[must_use]
    pub fn chains(&self) -> Vec<Vec<StageKind>> {
        self.inner.lock().chains.clone()
    }

    /// Returns the handle of the latest submission of a stage.
    #[must_use]
    pub fn handle_of(&self, kind: StageKind) -> Option<Handle> {
        self.inner
            .lock()
            .submitted
            .iter()
            .rev()
            .find(|r| r.kind() == kind)
            .map(|r| Handle::new(r.id()))
    }

    /// Delivers a snapshot for a stage to its observers.
    ///
    /// Returns false if the stage was never submitted.
    pub fn deliver(&self, kind: StageKind, state: WorkState) -> bool {
        let Some(handle) = self.handle_of(kind) else {
            return false;
        };
        let record = if state.is_success() {
            CompletionRecord::succeeded(handle, WorkData::single(kind.output_key(), "fake"))
        } else {
            CompletionRecord::new(handle, state)
        };
        self.timeline.record(format!("{kind} {state}"));

        let mut inner = self.inner.lock();
        if let Some(observers) = inner.observers.get_mut(&handle) {
            observers.retain(|tx| tx.send(record.clone()).is_ok());
        }
        true
    }

    /// Delivers a successful record for a stage.
    pub fn finish(&self, kind: StageKind) -> bool {
        self.deliver(kind, WorkState::Succeeded)
    }

    fn accept(inner: &mut FakeEngineInner, request: StageRequest) -> Handle {
        let handle = Handle::new(request.id());
        inner.submitted.push(request);
        inner.observers.entry(handle).or_default();
        handle
    }
}

impl ExecutionEngine for FakeEngine {
    fn submit(&self, request: StageRequest) -> Result<Handle, WorkflowError> {
        self.timeline.record(format!("submit {}", request.kind()));
        Ok(Self::accept(&mut self.inner.lock(), request))
    }

    fn submit_chain(&self, requests: Vec<StageRequest>) -> Result<Vec<Handle>, WorkflowError> {
        if requests.is_empty() {
            return Err(WorkflowError::EmptyChain);
        }
        let kinds: Vec<StageKind> = requests.iter().map(StageRequest::kind).collect();
        self.timeline.record(format!("submit chain {kinds:?}"));

        let mut inner = self.inner.lock();
        inner.chains.push(kinds);
        Ok(requests
            .into_iter()
            .map(|request| Self::accept(&mut inner, request))
            .collect())
    }

    fn observe(&self, handle: &Handle) -> Result<CompletionReceiver, WorkflowError> {
        let mut inner = self.inner.lock();
        let observers = inner
            .observers
            .get_mut(handle)
            .ok_or_else(|| WorkflowError::UnknownHandle(handle.to_string()))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(CompletionRecord::new(*handle, WorkState::Enqueued));
        observers.push(tx);
        Ok(rx)
    }
}

/// A launcher that records launches instead of running actions.
///
/// It can be told to fail for an action, and, when given a bus, to publish
/// the action's completion signal one or more times as soon as it launches.
#[derive(Debug, Default)]
pub struct FakeLauncher {
    bus: Option<SignalBus>,
    repeats: usize,
    timeline: Timeline,
    launches: Mutex<Vec<(ActionId, String)>>,
    failures: HashMap<ActionId, ActionLaunchError>,
}

impl FakeLauncher {
    /// Creates a launcher that never signals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a launcher that signals once per launch.
    #[must_use]
    pub fn signalling(bus: SignalBus) -> Self {
        Self {
            bus: Some(bus),
            repeats: 1,
            ..Self::default()
        }
    }

    /// Sets how many signals each launch publishes.
    #[must_use]
    pub fn with_repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats;
        self
    }

    /// Logs launches to a shared timeline.
    #[must_use]
    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = timeline;
        self
    }

    /// Makes launching an action fail.
    #[must_use]
    pub fn failing(mut self, action: ActionId, error: ActionLaunchError) -> Self {
        self.failures.insert(action, error);
        self
    }

    /// Returns every launched action in order.
    #[must_use]
    pub fn launches(&self) -> Vec<ActionId> {
        self.launches.lock().iter().map(|(a, _)| *a).collect()
    }

    /// Returns the identities actions were launched with.
    #[must_use]
    pub fn identities(&self) -> Vec<String> {
        self.launches.lock().iter().map(|(_, id)| id.clone()).collect()
    }

    /// Returns how many times an action was launched.
    #[must_use]
    pub fn launch_count(&self, action: ActionId) -> usize {
        self.launches.lock().iter().filter(|(a, _)| *a == action).count()
    }
}

impl ActionLauncher for FakeLauncher {
    fn launch(&self, action: ActionId, identity: &str) -> Result<(), ActionLaunchError> {
        self.timeline.record(format!("launch {action}"));
        self.launches.lock().push((action, identity.to_string()));

        if let Some(err) = self.failures.get(&action) {
            return Err(err.clone());
        }
        if let Some(bus) = &self.bus {
            for _ in 0..self.repeats {
                bus.publish(action, identity);
            }
        }
        Ok(())
    }
}
