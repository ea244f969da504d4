//! # svc-bench
//!
//! Measures discovery-registered services under a container orchestrator.
//!
//! ## Commands
//!
//! - `failure`: restart each service scaled and time its recovery
//! - `startup`: start each service from stopped and time its readiness
//! - `load`: start every service and drive concurrent probe batches
//!
//! ## Example
//!
//! ```bash
//! # Three startup trials using ./svc-bench.toml
//! svc-bench startup
//!
//! # Load trials with an explicit config and debug logs
//! RUST_LOG=svcbench_core=debug svc-bench --config bench/load.toml load
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use svcbench_core::{install_signal_handler, HarnessConfig, MetricFamily, Orchestrator, RunSummary};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Config file used when `--config` is not given.
const DEFAULT_CONFIG: &str = "svc-bench.toml";

/// Benchmark and health-verification harness for discovery-registered services.
#[derive(Parser, Debug)]
#[command(name = "svc-bench")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file [default: svc-bench.toml, built-in defaults if absent]
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Commands {
    /// Measure failure recovery after a scaled restart
    Failure,
    /// Measure startup time
    Startup,
    /// Run load batches at each configured stress level
    Load,
}

impl Commands {
    fn family(self) -> MetricFamily {
        match self {
            Commands::Failure => MetricFamily::FailureRecovery,
            Commands::Startup => MetricFamily::Startup,
            Commands::Load => MetricFamily::Load,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = load_config(cli.config.as_deref())?;
    let orchestrator = Orchestrator::with_compose(config).context("Failed to set up harness")?;

    let cancel = CancellationToken::new();
    let signals = install_signal_handler(cancel.clone());

    let summary = orchestrator
        .run(cli.command.family(), &cancel)
        .await
        .context("Run failed")?;
    signals.abort();

    print_summary(&summary);
    Ok(())
}

/// An explicit path must exist; the default path falls back to defaults.
fn load_config(explicit: Option<&Path>) -> Result<HarnessConfig> {
    let path = match explicit {
        Some(path) => path,
        None => {
            let default = Path::new(DEFAULT_CONFIG);
            if !default.exists() {
                tracing::info!("no {} found, using built-in defaults", DEFAULT_CONFIG);
                return Ok(HarnessConfig::default());
            }
            default
        }
    };

    let config = HarnessConfig::from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded configuration");
    Ok(config)
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{}: {} trial(s) over {} service(s){}",
        summary.family.as_str(),
        summary.trials.len(),
        summary.services,
        if summary.interrupted { " (interrupted)" } else { "" }
    );
    for outcome in &summary.trials {
        let report = match &outcome.report {
            Some(path) => path.display().to_string(),
            None => "no report".to_string(),
        };
        println!(
            "  trial {}: {} row(s), {}",
            outcome.trial.index, outcome.rows, report
        );
        if !outcome.failed_services.is_empty() {
            println!("    skipped: {}", outcome.failed_services.join(", "));
        }
    }
}
