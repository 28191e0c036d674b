//! Error reporting hook.

use crate::errors::WorkflowError;
use tracing::error;

/// Receives the error that halted a workflow.
pub trait ErrorReporter: Send + Sync {
    /// Reports an error. Must not block.
    fn report(&self, error: &WorkflowError);
}

/// Logs reported errors at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingErrorReporter;

impl ErrorReporter for LoggingErrorReporter {
    fn report(&self, err: &WorkflowError) {
        error!(code = err.code(), error = %err, "Workflow halted");
    }
}

/// Keeps reported errors for inspection in tests.
#[derive(Debug, Default)]
pub struct CollectingErrorReporter {
    errors: parking_lot::Mutex<Vec<WorkflowError>>,
}

impl CollectingErrorReporter {
    /// Creates an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every reported error.
    #[must_use]
    pub fn errors(&self) -> Vec<WorkflowError> {
        self.errors.lock().clone()
    }

    /// Returns the number of reported errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    /// Returns true if nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }
}

impl ErrorReporter for CollectingErrorReporter {
    fn report(&self, err: &WorkflowError) {
        self.errors.lock().push(err.clone());
    }
}
