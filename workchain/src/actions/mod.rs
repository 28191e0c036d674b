//! Notification actions and the launcher that starts them.
//!
//! Launching is fire-and-forget. The only way back from a running action to
//! the orchestrator is the action's completion signal on the [`SignalBus`].

mod notification;

pub use notification::{CountdownNotification, NotificationAction};

use crate::core::ActionId;
use crate::errors::ActionLaunchError;
use crate::signal::SignalBus;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// Starts notification actions.
#[cfg_attr(test, mockall::automock)]
pub trait ActionLauncher: Send + Sync {
    /// Starts the action without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the action could not be started at all.
    fn launch(&self, action: ActionId, identity: &str) -> Result<(), ActionLaunchError>;
}

/// Runs registered [`NotificationAction`]s on the tokio runtime and publishes
/// their completion signals.
#[derive(Clone)]
pub struct NotificationLauncher {
    actions: HashMap<ActionId, Arc<dyn NotificationAction>>,
    bus: SignalBus,
}

impl NotificationLauncher {
    /// Creates a launcher with no actions.
    #[must_use]
    pub fn new(bus: SignalBus) -> Self {
        Self {
            actions: HashMap::new(),
            bus,
        }
    }

    /// Registers an action.
    #[must_use]
    pub fn with_action(mut self, action: ActionId, runner: Arc<dyn NotificationAction>) -> Self {
        self.actions.insert(action, runner);
        self
    }

    /// Returns true if the action is registered.
    #[must_use]
    pub fn has_action(&self, action: ActionId) -> bool {
        self.actions.contains_key(&action)
    }
}

impl std::fmt::Debug for NotificationLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationLauncher")
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("bus", &self.bus)
            .finish()
    }
}

impl ActionLauncher for NotificationLauncher {
    fn launch(&self, action: ActionId, identity: &str) -> Result<(), ActionLaunchError> {
        let runner = self
            .actions
            .get(&action)
            .cloned()
            .ok_or(ActionLaunchError::NotRegistered(action))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| ActionLaunchError::RuntimeUnavailable(action))?;

        info!(action = %action, identity, "Launching notification action");
        let bus = self.bus.clone();
        let identity = identity.to_string();
        runtime.spawn(async move {
            match runner.run(&identity).await {
                Ok(()) => {
                    bus.publish(action, identity);
                }
                Err(e) => {
                    error!(action = %action, error = %e, "Notification action failed; no completion signal");
                }
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn instant(title: &str) -> Arc<dyn NotificationAction> {
        Arc::new(CountdownNotification::new(title, 0, Duration::ZERO))
    }

    #[tokio::test]
    async fn test_launch_publishes_signal() {
        let bus = SignalBus::new();
        let mut rx = bus.subscribe(ActionId::A);
        let launcher = NotificationLauncher::new(bus).with_action(ActionId::A, instant("A"));

        launcher.launch(ActionId::A, "001").unwrap();

        let signal = rx.recv().await.unwrap();
        assert_eq!(signal.action, ActionId::A);
        assert_eq!(signal.identity, "001");
    }

    #[tokio::test]
    async fn test_launch_unregistered_action() {
        let launcher = NotificationLauncher::new(SignalBus::new()).with_action(ActionId::A, instant("A"));
        tokio_test::assert_err!(launcher.launch(ActionId::B, "001"));
        assert_eq!(
            launcher.launch(ActionId::B, "001"),
            Err(ActionLaunchError::NotRegistered(ActionId::B))
        );
    }

    #[test]
    fn test_launch_without_runtime() {
        let launcher = NotificationLauncher::new(SignalBus::new()).with_action(ActionId::B, instant("B"));
        assert_eq!(
            launcher.launch(ActionId::B, "001"),
            Err(ActionLaunchError::RuntimeUnavailable(ActionId::B))
        );
    }

    #[tokio::test]
    async fn test_failed_action_publishes_nothing() {
        let bus = SignalBus::new();
        let mut rx = bus.subscribe(ActionId::A);
        let failing = Arc::new(CountdownNotification::new("broken", 0, Duration::ZERO).failing("no channel"));
        let launcher = NotificationLauncher::new(bus.clone()).with_action(ActionId::A, failing);

        tokio_test::assert_ok!(launcher.launch(ActionId::A, "001"));
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert!(rx.try_recv().is_err());
        assert_eq!(bus.published_count(), 0);
    }
}
