//! Configuration for the workflow runtime.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use crate::engine::RetryConfig;
use crate::errors::WorkflowError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Identity carried through every stage and action.
    #[serde(default = "default_identity")]
    pub identity: String,
    /// Whether stages require network connectivity.
    #[serde(default = "default_require_network")]
    pub require_network: bool,
    /// Per-action buffer of the signal bus.
    #[serde(default = "default_signal_capacity")]
    pub signal_capacity: usize,
    /// Retry policy for workers that ask to be retried.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Simulated worker settings.
    #[serde(default)]
    pub workers: WorkerConfig,
    /// Countdown notification settings.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

fn default_identity() -> String {
    "001".to_string()
}

fn default_require_network() -> bool {
    true
}

fn default_signal_capacity() -> usize {
    crate::signal::DEFAULT_CAPACITY
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            identity: default_identity(),
            require_network: default_require_network(),
            signal_capacity: default_signal_capacity(),
            retry: RetryConfig::default(),
            workers: WorkerConfig::default(),
            notifications: NotificationConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl WorkflowConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the identity.
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, WorkflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| WorkflowError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&contents)
    }

    /// Checks the values are usable.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.identity.trim().is_empty() {
            return Err(WorkflowError::Config("identity must not be empty".to_string()));
        }
        if self.signal_capacity == 0 {
            return Err(WorkflowError::Config("signal_capacity must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(WorkflowError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(WorkflowError::Config(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }
        if self.notifications.countdown_ticks > 0 && self.notifications.tick_interval_ms == 0 {
            return Err(WorkflowError::Config(
                "notifications.tick_interval_ms must be positive when ticks are set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for the simulated stage workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// How long each simulated stage takes, in milliseconds.
    pub work_duration_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_duration_ms: 1000,
        }
    }
}

impl WorkerConfig {
    /// Returns the work duration.
    #[must_use]
    pub fn work_duration(&self) -> Duration {
        Duration::from_millis(self.work_duration_ms)
    }
}

/// Settings for the countdown notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Number of countdown ticks before a notification completes.
    pub countdown_ticks: u32,
    /// Interval between ticks, in milliseconds.
    pub tick_interval_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: 3,
            tick_interval_ms: 1000,
        }
    }
}

impl NotificationConfig {
    /// Returns the tick interval.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, used when `RUST_LOG` is unset.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "workchain=info,warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = WorkflowConfig::from_json_str("{}").unwrap();
        assert_eq!(config, WorkflowConfig::default());
        assert_eq!(config.identity, "001");
        assert!(config.require_network);
        assert_eq!(config.signal_capacity, 16);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = WorkflowConfig::from_json_str(
            r#"{
                "identity": "042",
                "workers": {"work_duration_ms": 10},
                "retry": {"max_attempts": 5},
                "log": {"format": "json"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.identity, "042");
        assert_eq!(config.workers.work_duration(), Duration::from_millis(10));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, RetryConfig::default().base_delay_ms);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.filter, LogConfig::default().filter);
        assert_eq!(config.notifications, NotificationConfig::default());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        for json in [
            r#"{"identity": "  "}"#,
            r#"{"signal_capacity": 0}"#,
            r#"{"retry": {"max_attempts": 0}}"#,
            r#"{"retry": {"base_delay_ms": 10, "max_delay_ms": 5}}"#,
            r#"{"notifications": {"countdown_ticks": 2, "tick_interval_ms": 0}}"#,
        ] {
            let err = WorkflowConfig::from_json_str(json).unwrap_err();
            assert_eq!(err.code(), "CONFIG-INVALID", "{json}");
        }
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = WorkflowConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, WorkflowError::Serialization(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"identity": "007", "require_network": false}}"#).unwrap();

        let config = WorkflowConfig::from_file(file.path()).unwrap();
        assert_eq!(config.identity, "007");
        assert!(!config.require_network);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = WorkflowConfig::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, WorkflowError::Io(_)));
    }
}
