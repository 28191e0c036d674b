//! Constraint descriptors evaluated by the execution engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of network a stage needs before it may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    /// No network needed.
    #[default]
    NotRequired,
    /// Any working connection.
    Connected,
    /// A connection that is not metered.
    Unmetered,
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRequired => write!(f, "not_required"),
            Self::Connected => write!(f, "connected"),
            Self::Unmetered => write!(f, "unmetered"),
        }
    }
}

/// Preconditions a stage requires before it may run.
///
/// Pure data. The orchestrator never inspects whether these are satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Constraints {
    /// Required network.
    #[serde(default)]
    pub network: NetworkType,
}

impl Constraints {
    /// Creates a descriptor with no preconditions.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a descriptor requiring network connectivity.
    #[must_use]
    pub fn network_connected() -> Self {
        Self::none().with_network(NetworkType::Connected)
    }

    /// Sets the required network type.
    #[must_use]
    pub fn with_network(mut self, network: NetworkType) -> Self {
        self.network = network;
        self
    }

    /// Returns true if the descriptor needs any network.
    #[must_use]
    pub fn requires_network(&self) -> bool {
        self.network != NetworkType::NotRequired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_no_preconditions() {
        assert!(!Constraints::none().requires_network());
    }

    #[test]
    fn test_network_connected() {
        let c = Constraints::network_connected();
        assert_eq!(c.network, NetworkType::Connected);
        assert!(c.requires_network());
    }

    #[test]
    fn test_deserialize_defaults() {
        let c: Constraints = serde_json::from_str("{}").unwrap();
        assert_eq!(c, Constraints::none());
        let c: Constraints = serde_json::from_str(r#"{"network":"unmetered"}"#).unwrap();
        assert!(c.requires_network());
    }
}
