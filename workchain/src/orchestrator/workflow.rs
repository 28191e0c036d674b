//! The workflow orchestrator and its event loop.

use super::state::{transition, Effect, WorkflowInput, WorkflowState};
use crate::actions::ActionLauncher;
use crate::core::{ActionId, StageKind};
use crate::engine::{CompletionReceiver, ExecutionEngine};
use crate::errors::WorkflowError;
use crate::events::{ErrorReporter, EventSink, LoggingErrorReporter, LoggingEventSink};
use crate::request::{Constraints, StageRequest};
use crate::signal::SignalBus;
use futures::future;
use futures::stream::{self, BoxStream, SelectAll, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

/// Sequences the fixed workflow.
///
/// Stages 1 and 2 go to the engine as one chain. Stage 2 finishing launches
/// action A, action A's signal submits stage 3, stage 3 finishing launches
/// action B, and action B's signal ends the run. Each step starts only after
/// the previous one was observed, and at most once. Only signals carrying
/// the run's identity count, so runs sharing a bus never advance each other.
pub struct WorkflowOrchestrator {
    engine: Arc<dyn ExecutionEngine>,
    launcher: Arc<dyn ActionLauncher>,
    bus: SignalBus,
    sink: Arc<dyn EventSink>,
    reporter: Arc<dyn ErrorReporter>,
    constraints: Constraints,
    started: AtomicBool,
}

impl WorkflowOrchestrator {
    /// Creates an orchestrator that logs notices and errors.
    ///
    /// Stages require network connectivity unless overridden with
    /// [`with_constraints`](Self::with_constraints).
    #[must_use]
    pub fn new(
        engine: Arc<dyn ExecutionEngine>,
        launcher: Arc<dyn ActionLauncher>,
        bus: SignalBus,
    ) -> Self {
        Self {
            engine,
            launcher,
            bus,
            sink: Arc::new(LoggingEventSink::default()),
            reporter: Arc::new(LoggingErrorReporter),
            constraints: Constraints::network_connected(),
            started: AtomicBool::new(false),
        }
    }

    /// Sets the sink that receives step notices.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the hook that receives the error halting a run.
    #[must_use]
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Sets the constraints attached to every stage request.
    #[must_use]
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Starts the workflow for an identity.
    ///
    /// Must be called from within a tokio runtime. Returns as soon as the
    /// chain is submitted; progress is reported through the handle.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::AlreadyStarted`] if this orchestrator already
    /// started a run, or the engine's error if the chain cannot be submitted.
    pub fn start(&self, identity: impl Into<String>) -> Result<WorkflowHandle, WorkflowError> {
        let identity = identity.into();
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(WorkflowError::AlreadyStarted(identity));
        }
        let result = self.start_run(identity);
        if result.is_err() {
            self.started.store(false, Ordering::SeqCst);
        }
        result
    }

    fn start_run(&self, identity: String) -> Result<WorkflowHandle, WorkflowError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| WorkflowError::Internal(format!("No tokio runtime for workflow: {e}")))?;

        let first = StageRequest::for_identity(StageKind::First, self.constraints, &identity);
        let second = StageRequest::for_identity(StageKind::Second, self.constraints, &identity);
        let third = StageRequest::for_identity(StageKind::Third, self.constraints, &identity);

        // Subscribe before anything can launch an action.
        let mut inputs: SelectAll<BoxStream<'static, WorkflowInput>> = SelectAll::new();
        for action in ActionId::ALL {
            inputs.push(signal_stream(&self.bus, action, identity.clone()));
        }

        let handles = self.engine.submit_chain(vec![first, second])?;
        let &[first_handle, second_handle] = handles.as_slice() else {
            return Err(WorkflowError::Internal(format!(
                "Engine returned {} handles for a two-stage chain",
                handles.len()
            )));
        };
        inputs.push(completion_stream(StageKind::First, self.engine.observe(&first_handle)?));
        inputs.push(completion_stream(StageKind::Second, self.engine.observe(&second_handle)?));

        info!(identity = %identity, first = %first_handle, second = %second_handle, "Workflow started");

        let (state_tx, state_rx) = watch::channel(WorkflowState::initial());
        let run = WorkflowRun {
            identity: identity.clone(),
            engine: Arc::clone(&self.engine),
            launcher: Arc::clone(&self.launcher),
            sink: Arc::clone(&self.sink),
            reporter: Arc::clone(&self.reporter),
            third: Some(third),
            inputs,
            state_tx,
        };
        let span = info_span!("workflow", identity = %identity);
        let task = runtime.spawn(run.drive().instrument(span));

        Ok(WorkflowHandle {
            identity,
            state: state_rx,
            task,
        })
    }
}

impl std::fmt::Debug for WorkflowOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowOrchestrator")
            .field("bus", &self.bus)
            .field("constraints", &self.constraints)
            .field("started", &self.started.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Signals for one action, restricted to this run's identity.
///
/// The bus is shared by every run in the process.
fn signal_stream(bus: &SignalBus, action: ActionId, identity: String) -> BoxStream<'static, WorkflowInput> {
    bus.subscribe_stream(action)
        .filter(move |signal| {
            let ours = signal.identity == identity;
            if !ours {
                debug!(action = %action, from = %signal.identity, "Ignoring signal for another run");
            }
            future::ready(ours)
        })
        .map(WorkflowInput::Signal)
        .boxed()
}

fn completion_stream(stage: StageKind, rx: CompletionReceiver) -> BoxStream<'static, WorkflowInput> {
    stream::unfold(rx, move |mut rx| async move {
        let record = rx.recv().await?;
        Some((WorkflowInput::StageUpdate { stage, record }, rx))
    })
    .boxed()
}

struct WorkflowRun {
    identity: String,
    engine: Arc<dyn ExecutionEngine>,
    launcher: Arc<dyn ActionLauncher>,
    sink: Arc<dyn EventSink>,
    reporter: Arc<dyn ErrorReporter>,
    third: Option<StageRequest>,
    inputs: SelectAll<BoxStream<'static, WorkflowInput>>,
    state_tx: watch::Sender<WorkflowState>,
}

impl WorkflowRun {
    async fn drive(mut self) -> WorkflowState {
        let mut state = WorkflowState::initial();
        while !state.is_terminal() {
            let Some(input) = self.inputs.next().await else {
                warn!(state = %state, "Every workflow input closed; run stalled");
                break;
            };
            state = self.step(state, input);
        }
        info!(state = %state, "Workflow loop finished");
        state
    }

    /// Applies one input and any follow-up inputs its effects produce.
    fn step(&mut self, mut state: WorkflowState, input: WorkflowInput) -> WorkflowState {
        let mut pending = VecDeque::from([input]);
        while let Some(input) = pending.pop_front() {
            let (next, effects) = transition(&state, &input);
            if next != state {
                debug!(from = %state, to = %next, "Workflow transition");
                self.state_tx.send_replace(next.clone());
            }
            state = next;
            pending.extend(effects.into_iter().filter_map(|effect| self.apply(effect)));
        }
        state
    }

    fn apply(&mut self, effect: Effect) -> Option<WorkflowInput> {
        match effect {
            Effect::Notify(event) => {
                self.sink.try_emit(&event);
                None
            }
            Effect::Launch(action) => match self.launcher.launch(action, &self.identity) {
                Ok(()) => None,
                Err(err) => {
                    warn!(action = %action, error = %err, "Notification action failed to launch");
                    Some(WorkflowInput::LaunchFailed(err))
                }
            },
            Effect::SubmitThird => {
                let request = self.third.take()?;
                let observed = self
                    .engine
                    .submit(request)
                    .and_then(|handle| self.engine.observe(&handle));
                match observed {
                    Ok(rx) => {
                        self.inputs.push(completion_stream(StageKind::Third, rx));
                        None
                    }
                    Err(err) => Some(WorkflowInput::SubmitFailed(err)),
                }
            }
            Effect::Report(err) => {
                self.reporter.report(&err);
                None
            }
        }
    }
}

/// Handle to a started workflow run.
#[derive(Debug)]
pub struct WorkflowHandle {
    identity: String,
    state: watch::Receiver<WorkflowState>,
    task: JoinHandle<WorkflowState>,
}

impl WorkflowHandle {
    /// Returns the identity the run was started with.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.state.borrow().clone()
    }

    /// Returns a receiver that observes every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state.clone()
    }

    /// Returns true while the event loop is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Waits for the run to reach a terminal state.
    ///
    /// A stalled run never resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the event loop ended without reaching a terminal
    /// state, which happens only when every input source was dropped.
    pub async fn wait(&mut self) -> Result<WorkflowState, WorkflowError> {
        self.state
            .wait_for(WorkflowState::is_terminal)
            .await
            .map(|state| state.clone())
            .map_err(|_| {
                WorkflowError::Internal("Workflow loop ended before a terminal state".to_string())
            })
    }
}
