//! vshd - Voice smart-home bridge daemon
//!
//! Reads line-delimited JSON from stdin (directives, backend state changes,
//! re-collection requests) and writes responses and change reports to stdout.
//! Logs go to stderr.
//!
//! Usage:
//!   vshd [OPTIONS] [vshd.toml]

mod config;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vsh_bridge::DeviceManager;
use vsh_core::EventEnvelope;
use vsh_memory::{load_feed, MemoryBackend};

use crate::config::DaemonConfig;

const DEFAULT_LOG_FILTER: &str = "vshd=info,vsh_bridge=info,vsh_memory=debug";

#[derive(Parser)]
#[command(name = "vshd")]
#[command(author, version, about = "Voice smart-home bridge daemon")]
struct Cli {
    /// Daemon config file (TOML)
    #[arg(env = "VSHD_CONFIG")]
    config: Option<PathBuf>,

    /// Discovery feed replacing the configured controls (.yaml, .json or .toml)
    #[arg(short, long)]
    feed: Option<PathBuf>,

    /// Log as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_logging(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    tracing::info!("Starting vshd (voice smart-home bridge)");

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading config");
            DaemonConfig::load(path)?
        }
        None => {
            tracing::info!("No config file provided, starting with an empty backend");
            DaemonConfig::default()
        }
    };
    if let Some(feed) = &cli.feed {
        config.backend.controls = load_feed(feed)
            .with_context(|| format!("Failed to load feed {}", feed.display()))?;
        tracing::info!(
            path = %feed.display(),
            controls = config.backend.controls.len(),
            "Loaded discovery feed"
        );
    }

    let backend = Arc::new(MemoryBackend::new(&config.backend));
    let manager = Arc::new(
        DeviceManager::new(backend.clone(), config.bridge).context("Invalid bridge config")?,
    );
    manager
        .collect_endpoints()
        .await
        .context("Initial endpoint collection failed")?;
    tracing::info!(endpoints = manager.endpoints().len(), "Bridge ready");

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_events(out_rx));

    // backend changes -> manager
    let mut backend_changes = backend.subscribe_changes();
    let pump_manager = manager.clone();
    tokio::spawn(async move {
        loop {
            match backend_changes.recv().await {
                Ok(change) => {
                    pump_manager.handle_backend_change(&change).await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Backend change stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // change reports -> stdout
    let mut reports = manager.subscribe_changes();
    let report_tx = out_tx.clone();
    let forwarder = tokio::spawn(async move {
        loop {
            match reports.recv().await {
                Ok(report) => {
                    if report_tx.send(report).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Change report stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = session::serve(manager, stdin, out_tx) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }

    // closing the last sender lets the writer drain and finish
    forwarder.abort();
    let _ = forwarder.await;
    writer.await.context("Output writer panicked")??;
    tracing::info!("vshd stopped");
    Ok(())
}

async fn write_events(mut rx: mpsc::UnboundedReceiver<EventEnvelope>) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(event) = rx.recv().await {
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        stdout.write_all(&line).await?;
        stdout.flush().await?;
    }
    Ok(())
}
