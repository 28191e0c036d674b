//! Logging setup.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the binary or the embedding host.

use crate::config::{LogConfig, LogFormat};
use crate::errors::WorkflowError;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Builds the filter: `RUST_LOG` when set, otherwise the configured directive.
pub fn env_filter(config: &LogConfig) -> Result<EnvFilter, WorkflowError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => parse_filter(&config.filter),
    }
}

fn parse_filter(directives: &str) -> Result<EnvFilter, WorkflowError> {
    EnvFilter::try_new(directives)
        .map_err(|e| WorkflowError::Config(format!("invalid log filter '{directives}': {e}")))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails on an invalid filter or if a global subscriber is already set.
pub fn init_tracing(config: &LogConfig) -> Result<(), WorkflowError> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry();
    let result = match config.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true).with_filter(filter))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_filter(filter),
            )
            .try_init(),
    };
    result.map_err(|e| WorkflowError::Internal(format!("tracing already initialized: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        assert!(parse_filter("workchain=debug,warn").is_ok());
        let err = parse_filter("workchain=notalevel").unwrap_err();
        assert_eq!(err.code(), "CONFIG-INVALID");
    }

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig::default();
        // Another test may have installed one already; the second call fails either way.
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
