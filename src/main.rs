//! Web honeypot.
//!
//! Answers probing HTTP requests with canned, signature-selected responses
//! and ships every captured request to a telemetry collector.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────────┐
//!                      │                   WEB HONEYPOT                    │
//!                      │                                                   │
//!   TLS (stunnel) ─────┼──▶ tunnel ──┐                                     │
//!                      │             ▼                                     │
//!   Attacker ──────────┼──▶ net::listener ──▶ worker thread                │
//!                      │                        │                          │
//!                      │                        ▼                          │
//!                      │            http::responder ◀── Snapshot (ArcSwap) │
//!                      │             │     │                ▲              │
//!   Canned response ◀──┼─────────────┘     │                │ reload       │
//!                      │                   ▼                │              │
//!                      │              telemetry ──▶ collector (HTTP)       │
//!                      │                                                   │
//!                      │   lifecycle: signals, startup, drain, reload      │
//!                      └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use clap::Parser;

use web_honeypot::config::{load_config, DataWatcher};
use web_honeypot::lifecycle::{forward_signals, Harness};
use web_honeypot::observability::{logging, metrics};
use web_honeypot::signatures::RuleScorer;
use web_honeypot::telemetry::CollectorSink;
use web_honeypot::tunnel::StunnelManager;

#[derive(Parser)]
#[command(name = "web-honeypot")]
#[command(about = "Deceptive HTTP responder that records probing traffic", long_about = None)]
struct Cli {
    /// Primary configuration file
    #[arg(short, long, default_value = "/etc/honeypot/honeypot.toml")]
    config: PathBuf,

    /// Response customizations file (overrides data.customizations_path)
    #[arg(short, long)]
    response: Option<PathBuf>,

    /// Force debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };
    if let Some(path) = cli.response {
        config.data.customizations_path = path;
    }
    config.observability.debug |= cli.debug;

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "web-honeypot starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let sink = Arc::new(CollectorSink::new(config.telemetry.clone())?);
    let tunnel = Arc::new(StunnelManager::new(config.tunnel.clone()));
    let harness = Harness::new(config.clone(), sink, tunnel, Arc::new(RuleScorer));

    forward_signals(harness.control());

    // Dropping the watcher stops it, so it lives until run returns.
    let _watcher = if config.data.watch {
        let paths = vec![
            config.data.signatures_path.clone(),
            config.data.responses_path.clone(),
            config.data.customizations_path.clone(),
        ];
        match DataWatcher::new(paths, harness.control()).run() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::error!(error = %e, "Failed to start data watcher, continuing without it");
                None
            }
        }
    } else {
        None
    };

    harness.run().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
