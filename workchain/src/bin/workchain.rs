//! Workchain - runs the chained workflow once with simulated workers.

use anyhow::{bail, Context as _, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use workchain::config::{LogFormat, WorkflowConfig};
use workchain::context::WorkflowContext;
use workchain::engine::NetworkMonitor;
use workchain::observability::init_tracing;
use workchain::orchestrator::WorkflowState;

/// Workchain - chained background stages linked by notification actions
#[derive(Parser)]
#[command(name = "workchain")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long, env = "WORKCHAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Identity to run the workflow for (overrides the config)
    #[arg(short, long)]
    identity: Option<String>,

    /// Start offline and connect after this many milliseconds
    #[arg(long)]
    offline_ms: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<WorkflowConfig> {
    let mut config = match &cli.config {
        Some(path) => WorkflowConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => WorkflowConfig::default(),
    };
    if let Some(identity) = &cli.identity {
        config.identity.clone_from(identity);
    }
    if cli.json_logs {
        config.log.format = LogFormat::Json;
    }
    if cli.verbose {
        config.log.filter = "workchain=debug,info".to_string();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.log)?;

    let network = match cli.offline_ms {
        Some(_) => NetworkMonitor::offline(),
        None => NetworkMonitor::online(),
    };
    let context = WorkflowContext::with_network(&config, network.clone())?;

    if let Some(delay) = cli.offline_ms {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            info!(after_ms = delay, "Network connected");
            network.set_connected(true);
        });
    }

    let mut handle = context.orchestrator().start(config.identity.clone())?;
    let state = handle.wait().await?;

    match state {
        WorkflowState::Completed => {
            info!(identity = %handle.identity(), "Workflow completed");
            Ok(())
        }
        WorkflowState::Halted { step, reason } => bail!("workflow halted at {step}: {reason}"),
        other => bail!("workflow ended in non-terminal state {other}"),
    }
}
