//! Process-wide workflow context.
//!
//! Owns the collaborators every run shares: the signal bus, connectivity
//! monitor, execution engine and notification launcher. Orchestrators are
//! created from it, one per run.

use crate::actions::{ActionLauncher, CountdownNotification, NotificationLauncher};
use crate::config::WorkflowConfig;
use crate::core::ActionId;
use crate::engine::{ExecutionEngine, LocalEngine, NetworkMonitor, WorkerRegistry};
use crate::errors::WorkflowError;
use crate::events::{ErrorReporter, EventSink, LoggingErrorReporter, LoggingEventSink};
use crate::orchestrator::WorkflowOrchestrator;
use crate::request::Constraints;
use crate::signal::SignalBus;
use std::sync::Arc;

/// Shared wiring for workflow runs.
#[derive(Clone)]
pub struct WorkflowContext {
    config: WorkflowConfig,
    bus: SignalBus,
    network: NetworkMonitor,
    engine: Arc<dyn ExecutionEngine>,
    launcher: Arc<dyn ActionLauncher>,
    sink: Arc<dyn EventSink>,
    reporter: Arc<dyn ErrorReporter>,
}

impl WorkflowContext {
    /// Builds the context from validated configuration with the network
    /// initially online.
    pub fn from_config(config: &WorkflowConfig) -> Result<Self, WorkflowError> {
        Self::with_network(config, NetworkMonitor::online())
    }

    /// Builds the context around an existing connectivity monitor.
    pub fn with_network(config: &WorkflowConfig, network: NetworkMonitor) -> Result<Self, WorkflowError> {
        config.validate()?;

        let bus = SignalBus::with_capacity(config.signal_capacity);
        let engine = LocalEngine::new(
            WorkerRegistry::simulated(config.workers.work_duration()),
            network.clone(),
            config.retry.clone(),
        );
        let ticks = config.notifications.countdown_ticks;
        let interval = config.notifications.tick_interval();
        let launcher = NotificationLauncher::new(bus.clone())
            .with_action(
                ActionId::A,
                Arc::new(CountdownNotification::new("Notification A", ticks, interval)),
            )
            .with_action(
                ActionId::B,
                Arc::new(CountdownNotification::new("Notification B", ticks, interval)),
            );

        Ok(Self {
            config: config.clone(),
            bus,
            network,
            engine: Arc::new(engine),
            launcher: Arc::new(launcher),
            sink: Arc::new(LoggingEventSink::default()),
            reporter: Arc::new(LoggingErrorReporter),
        })
    }

    /// Replaces the event sink given to new orchestrators.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replaces the error reporter given to new orchestrators.
    #[must_use]
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replaces the notification launcher.
    #[must_use]
    pub fn with_launcher(mut self, launcher: Arc<dyn ActionLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Creates an orchestrator wired to this context.
    #[must_use]
    pub fn orchestrator(&self) -> WorkflowOrchestrator {
        let constraints = if self.config.require_network {
            Constraints::network_connected()
        } else {
            Constraints::none()
        };
        WorkflowOrchestrator::new(Arc::clone(&self.engine), Arc::clone(&self.launcher), self.bus.clone())
            .with_event_sink(Arc::clone(&self.sink))
            .with_error_reporter(Arc::clone(&self.reporter))
            .with_constraints(constraints)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Returns the signal bus.
    #[must_use]
    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    /// Returns the connectivity monitor.
    #[must_use]
    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    /// Returns the execution engine.
    #[must_use]
    pub fn engine(&self) -> Arc<dyn ExecutionEngine> {
        Arc::clone(&self.engine)
    }
}

impl std::fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("identity", &self.config.identity)
            .field("bus", &self.bus)
            .field("network", &self.network.status())
            .finish_non_exhaustive()
    }
}
