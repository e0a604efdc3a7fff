//! # Node Bridge
//!
//! Entry point: parse flags, load configuration, install logging and serve
//! the control API until Ctrl+C.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bridge_runtime::{BridgeConfig, BridgeRuntime};

/// Bridges a pub/sub bus to HTTP microservices.
#[derive(Parser, Debug)]
#[command(name = "bridge-runtime")]
#[command(about = "Control plane bridging a pub/sub bus to HTTP nodes")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Control API bind host
    #[arg(long)]
    host: Option<String>,

    /// Control API port
    #[arg(short, long)]
    port: Option<u16>,

    /// Bus address label used for node connections
    #[arg(long)]
    bus_address: Option<String>,

    /// Seconds between watchdog probes
    #[arg(long)]
    watchdog_interval: Option<u64>,
}

impl Args {
    fn apply(&self, config: &mut BridgeConfig) {
        if let Some(host) = &self.host {
            config.api.host = host.clone();
        }
        if let Some(port) = self.port {
            config.api.port = port;
        }
        if let Some(address) = &self.bus_address {
            config.bus.address = address.clone();
        }
        if let Some(secs) = self.watchdog_interval {
            config.watchdog.interval_secs = secs;
        }
    }
}

fn load_config(args: &Args) -> Result<BridgeConfig> {
    let mut config = match &args.config {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    config.apply_env();
    args.apply(&mut config);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let runtime = BridgeRuntime::new(config)?;
    let listener = runtime.bind().await?;

    info!("Node bridge is running. Press Ctrl+C to stop.");
    runtime
        .serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
            }
            info!("Initiating graceful shutdown...");
        })
        .await?;

    info!("Shutdown complete");
    Ok(())
}
