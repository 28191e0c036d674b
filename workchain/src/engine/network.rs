//! Connectivity tracking used to gate constrained stages.

use crate::request::{Constraints, NetworkType};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

/// Observed network conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkStatus {
    /// Whether any connection is up.
    pub connected: bool,
    /// Whether the connection is metered.
    pub metered: bool,
}

impl NetworkStatus {
    /// No connection.
    #[must_use]
    pub const fn offline() -> Self {
        Self {
            connected: false,
            metered: false,
        }
    }

    /// An unmetered connection.
    #[must_use]
    pub const fn online() -> Self {
        Self {
            connected: true,
            metered: false,
        }
    }

    /// Returns true if these conditions meet the descriptor.
    #[must_use]
    pub fn satisfies(&self, constraints: &Constraints) -> bool {
        match constraints.network {
            NetworkType::NotRequired => true,
            NetworkType::Connected => self.connected,
            NetworkType::Unmetered => self.connected && !self.metered,
        }
    }
}

/// Shared, cloneable view of connectivity.
///
/// The host updates it; the engine waits on it.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    tx: watch::Sender<NetworkStatus>,
}

impl NetworkMonitor {
    /// Creates a monitor with the given initial status.
    #[must_use]
    pub fn new(initial: NetworkStatus) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Creates a monitor that starts online.
    #[must_use]
    pub fn online() -> Self {
        Self::new(NetworkStatus::online())
    }

    /// Creates a monitor that starts offline.
    #[must_use]
    pub fn offline() -> Self {
        Self::new(NetworkStatus::offline())
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> NetworkStatus {
        *self.tx.borrow()
    }

    /// Publishes a new status.
    pub fn set_status(&self, status: NetworkStatus) {
        debug!(connected = status.connected, metered = status.metered, "Network status changed");
        self.tx.send_replace(status);
    }

    /// Convenience for toggling plain connectivity.
    pub fn set_connected(&self, connected: bool) {
        self.set_status(NetworkStatus {
            connected,
            metered: false,
        });
    }

    /// Returns true if the constraints are met right now.
    #[must_use]
    pub fn is_satisfied(&self, constraints: &Constraints) -> bool {
        self.status().satisfies(constraints)
    }

    /// Waits until the constraints are met.
    ///
    /// Never resolves if they never are.
    pub async fn wait_until_satisfied(&self, constraints: &Constraints) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|status| status.satisfies(constraints)).await;
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_satisfies() {
        let any = Constraints::network_connected();
        let unmetered = Constraints::none().with_network(NetworkType::Unmetered);
        let metered = NetworkStatus {
            connected: true,
            metered: true,
        };

        assert!(NetworkStatus::offline().satisfies(&Constraints::none()));
        assert!(!NetworkStatus::offline().satisfies(&any));
        assert!(metered.satisfies(&any));
        assert!(!metered.satisfies(&unmetered));
        assert!(NetworkStatus::online().satisfies(&unmetered));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_satisfied_resumes_when_online() {
        let monitor = NetworkMonitor::offline();
        let waiter = monitor.clone();
        let task = tokio::spawn(async move {
            waiter
                .wait_until_satisfied(&Constraints::network_connected())
                .await;
        });

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!task.is_finished());

        monitor.set_connected(true);
        tokio::time::timeout(Duration::from_millis(5), task)
            .await
            .expect("waiter should resume")
            .unwrap();
    }
}
