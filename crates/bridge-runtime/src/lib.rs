//! # Node Bridge Runtime
//!
//! Wires the control plane together.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, TOML file, environment, flags)
//! 2. Validate it
//! 3. Build the in-memory bus, the HTTP node client and the node manager
//! 4. Bind and serve the control API
//! 5. On shutdown: stop the API, then stop every node and its watchdog

pub mod config;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use bridge_core::{BusTransportFactory, HttpNodeClient, NodeControl, NodeManager};
use shared_bus::InMemoryBus;
use tokio::net::TcpListener;
use tracing::info;

pub use config::{BridgeConfig, ConfigError};

/// The assembled control plane.
pub struct BridgeRuntime {
    config: BridgeConfig,
    bus: Arc<InMemoryBus>,
    manager: Arc<NodeManager>,
}

impl BridgeRuntime {
    /// Build every component from `config`.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or if the HTTP client cannot be built.
    pub fn new(config: BridgeConfig) -> Result<Self> {
        config.validate().context("invalid configuration")?;

        let bus = Arc::new(InMemoryBus::with_capacity(config.bus.channel_capacity));
        let http = Arc::new(
            HttpNodeClient::new(config.nodes.probe_host.clone(), config.probe_timeout())
                .context("failed to build HTTP client")?,
        );
        let manager = Arc::new(NodeManager::new(
            config.manager(),
            Arc::new(BusTransportFactory::new(bus.clone())),
            http.clone(),
            http,
        ));

        info!(
            bus = %config.bus.address,
            watchdog_interval_secs = config.watchdog.interval_secs,
            "Bridge runtime assembled"
        );
        Ok(Self {
            config,
            bus,
            manager,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The shared bus. Callers in the same process publish on it.
    pub fn bus(&self) -> Arc<InMemoryBus> {
        Arc::clone(&self.bus)
    }

    pub fn manager(&self) -> Arc<NodeManager> {
        Arc::clone(&self.manager)
    }

    /// Control API router over the node manager.
    pub fn router(&self) -> Router {
        let control: Arc<dyn NodeControl> = self.manager.clone();
        bridge_api::router(control, self.config.request_timeout())
    }

    /// Bind the configured listen address.
    ///
    /// # Errors
    ///
    /// Fails if the address cannot be bound.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.listen_addr();
        TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind control API on {addr}"))
    }

    /// Serve the control API on `listener` until `shutdown` resolves, then
    /// stop every node.
    ///
    /// # Errors
    ///
    /// Fails if the server stops with an I/O error. Nodes are stopped either way.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listener.local_addr().context("listener has no address")?;
        let served = bridge_api::serve(listener, self.router(), shutdown).await;
        self.manager.shutdown().await;
        served.with_context(|| format!("control API on {addr} failed"))
    }
}
