//! # precis - command-line entry point
//!
//! ## Commands
//!
//! - `summarize <FILE>` runs one document through the pipeline and stores its record
//! - `watch <DIR>` queues existing files, then every new file, until Ctrl+C
//! - `list` prints stored records, newest first
//! - `probe` checks the completion service and prints its health
//!
//! ## Configuration
//!
//! Defaults, then the `--config` TOML file, then environment variables, then
//! `--out`. An invalid configuration halts startup with the reason.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

mod cli;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use precis::precis_completion::{CompletionService, Gateway};
use precis::{App, AppConfig, SummaryStore, queue, watch_directory};

use crate::cli::{Cli, Commands};

/// How long `watch` waits for in-flight documents after Ctrl+C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Summarize { file, print } => {
            let started = Instant::now();
            let app = App::from_config(&config).context("Failed to initialize summarizer")?;
            let processed = app
                .process_path(&file)
                .await
                .with_context(|| format!("Failed to summarize {}", file.display()))?;

            info!(
                file_name = %processed.document_name,
                chunks = processed.chunks,
                degraded = processed.degraded,
                elapsed_ms = started.elapsed().as_millis(),
                "Summary written to {}",
                processed.record_path.display()
            );
            if print {
                println!("{}", processed.summary);
            }
        }
        Commands::Watch { dir } => run_watch(&config, &dir).await?,
        Commands::List { json } => {
            let entries = SummaryStore::new(&config.summary_dir)
                .list()
                .context("Failed to list summaries")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    let date = entry
                        .processed_at
                        .map_or_else(|| "unknown".to_string(), |at| at.format("%Y-%m-%d").to_string());
                    let marker = if entry.error.is_some() { " [error]" } else { "" };
                    println!("{date}  {}{marker}", entry.file_name);
                }
            }
        }
        Commands::Probe => {
            let gateway =
                Gateway::with_config(config.gateway.clone()).context("Failed to build completion gateway")?;
            let status = gateway.probe().await;
            println!("{}", serde_json::to_string_pretty(&status)?);
            if !status.healthy {
                warn!(
                    consecutive_failures = status.consecutive_failures,
                    "Completion service is unhealthy"
                );
            }
        }
    }

    Ok(())
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref()).context(
        "Configuration is invalid. Check the --config file and the LLM_*/PDF_*/PRECIS_* variables",
    )?;
    if let Some(out) = &cli.out {
        config.summary_dir.clone_from(out);
    }
    Ok(config)
}

async fn run_watch(config: &AppConfig, dir: &std::path::Path) -> Result<()> {
    let app = Arc::new(App::from_config(config).context("Failed to initialize summarizer")?);
    let (documents, dispatcher) = queue::start(app, &config.queue);

    let watcher = watch_directory(dir, documents)
        .await
        .with_context(|| format!("Failed to watch {}", dir.display()))?;

    info!(dir = %watcher.dir().display(), "precis is running. Press Ctrl+C to stop.");
    wait_for_shutdown().await;

    // Dropping the watcher releases the last queue sender.
    drop(watcher);
    match tokio::time::timeout(SHUTDOWN_GRACE, dispatcher.finish()).await {
        Ok(stats) => info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            "precis stopped gracefully"
        ),
        Err(_) => warn!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "In-flight documents did not finish before shutdown"
        ),
    }
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C).
async fn wait_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(err) => error!("Failed to listen for shutdown signal: {}", err),
    }
}
