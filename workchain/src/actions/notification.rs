//! Notification actions.

use crate::errors::WorkflowError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;
use tracing::info;

/// An out-of-band action the orchestrator launches between stages.
#[async_trait]
pub trait NotificationAction: Send + Sync + Debug {
    /// Runs the action to completion.
    async fn run(&self, identity: &str) -> Result<(), WorkflowError>;
}

/// A notification that counts down for a number of ticks, then completes.
///
/// Rendering belongs to the host; progress is only logged.
#[derive(Debug, Clone)]
pub struct CountdownNotification {
    title: String,
    ticks: u32,
    interval: Duration,
    failure: Option<String>,
}

impl CountdownNotification {
    /// Creates a countdown notification.
    #[must_use]
    pub fn new(title: impl Into<String>, ticks: u32, interval: Duration) -> Self {
        Self {
            title: title.into(),
            ticks,
            interval,
            failure: None,
        }
    }

    /// Makes the notification fail after its countdown.
    #[must_use]
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Returns the notification title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns how long the countdown takes.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.interval * self.ticks
    }
}

#[async_trait]
impl NotificationAction for CountdownNotification {
    async fn run(&self, identity: &str) -> Result<(), WorkflowError> {
        info!(title = %self.title, identity, "Notification shown");
        for remaining in (0..self.ticks).rev() {
            tokio::time::sleep(self.interval).await;
            info!(title = %self.title, remaining, "Countdown");
        }
        if let Some(reason) = &self.failure {
            return Err(WorkflowError::Internal(format!("{}: {reason}", self.title)));
        }
        info!(title = %self.title, identity, "Notification finished");
        Ok(())
    }
}
