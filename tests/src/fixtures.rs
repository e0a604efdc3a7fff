//! # Test Fixtures
//!
//! Real downstream nodes served by axum on ephemeral ports, a transport
//! wrapper that counts lifecycle calls, and a harness wiring the node
//! manager to the in-memory bus and the reqwest client.

use async_trait::async_trait;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use bridge_core::ports::{
    BusHandler, SubscribeOptions, SubscriptionHandle, Transport, TransportFactory,
};
use bridge_core::{
    BusTransportFactory, HttpNodeClient, ManagerConfig, NodeDescription, NodeManager, Service,
    ServiceMap, TransportError,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use shared_bus::InMemoryBus;
use shared_types::Reply;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

// =============================================================================
// FAKE DOWNSTREAM NODE
// =============================================================================

#[derive(Clone, Default)]
struct NodeShared {
    unhealthy: Arc<AtomicBool>,
    received: Arc<Mutex<Vec<(String, Value)>>>,
}

/// An HTTP microservice answering health checks, `/greet` and `/audit`.
pub struct FakeNode {
    port: u16,
    shared: NodeShared,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl FakeNode {
    pub async fn spawn() -> Self {
        let shared = NodeShared::default();
        let router = Router::new()
            .route("/", get(|| async { "fake node" }))
            .route("/health_check", get(health))
            .route("/greet", post(greet))
            .route("/audit", post(audit))
            .with_state(shared.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            port,
            shared,
            shutdown: Some(tx),
            task: Some(task),
        }
    }

    pub fn port(&self) -> String {
        self.port.to_string()
    }

    /// Make the health path answer `OK` or not.
    pub fn set_healthy(&self, healthy: bool) {
        self.shared.unhealthy.store(!healthy, Ordering::SeqCst);
    }

    /// Every POST received, as `(path, body)`.
    pub fn received(&self) -> Vec<(String, Value)> {
        self.shared.received.lock().clone()
    }

    /// Stop listening. The port is closed once this returns.
    pub async fn close(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = tokio::time::timeout(Duration::from_secs(5), task).await;
        }
    }

    /// Description declaring the `greet` service.
    pub fn description(&self) -> NodeDescription {
        let mut services = ServiceMap::new();
        services.insert(
            "greet".into(),
            Service {
                group: "greeters".into(),
                path: "/greet".into(),
                timeout: 5,
            },
        );
        NodeDescription {
            port: self.port(),
            health_check: "/health_check".into(),
            services,
            slots: Vec::new(),
        }
    }
}

impl Drop for FakeNode {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn health(State(shared): State<NodeShared>) -> &'static str {
    if shared.unhealthy.load(Ordering::SeqCst) {
        "DOWN"
    } else {
        "OK"
    }
}

async fn greet(State(shared): State<NodeShared>, Json(body): Json<Value>) -> Json<Value> {
    let name = body["data"]["name"].as_str().unwrap_or("stranger").to_string();
    shared.received.lock().push(("/greet".into(), body));
    Json(json!({"greeting": format!("Hello {name}")}))
}

async fn audit(State(shared): State<NodeShared>, Json(body): Json<Value>) -> Json<Value> {
    shared.received.lock().push(("/audit".into(), body));
    Json(json!({}))
}

/// A port nothing listens on.
pub async fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port.to_string()
}

// =============================================================================
// COUNTING TRANSPORT
// =============================================================================

/// Lifecycle calls observed on one node's transport.
#[derive(Default)]
pub struct TransportCounts {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl TransportCounts {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

struct CountingTransport {
    inner: Arc<dyn Transport>,
    counts: Arc<TransportCounts>,
}

#[async_trait]
impl Transport for CountingTransport {
    fn start(&self) -> Result<(), TransportError> {
        self.counts.starts.fetch_add(1, Ordering::SeqCst);
        self.inner.start()
    }

    fn stop(&self) -> Result<(), TransportError> {
        self.counts.stops.fetch_add(1, Ordering::SeqCst);
        self.inner.stop()
    }

    fn reply_to(
        &self,
        topic: &str,
        handler: Arc<dyn BusHandler>,
        options: SubscribeOptions,
    ) -> Result<SubscriptionHandle, TransportError> {
        self.inner.reply_to(topic, handler, options)
    }

    fn slot(
        &self,
        topic: &str,
        handler: Arc<dyn BusHandler>,
        options: SubscribeOptions,
    ) -> Result<SubscriptionHandle, TransportError> {
        self.inner.slot(topic, handler, options)
    }

    fn unsubscribe_reply(
        &self,
        topic: &str,
        handle: SubscriptionHandle,
    ) -> Result<(), TransportError> {
        self.inner.unsubscribe_reply(topic, handle)
    }

    fn unsubscribe_slot(
        &self,
        topic: &str,
        handle: SubscriptionHandle,
    ) -> Result<(), TransportError> {
        self.inner.unsubscribe_slot(topic, handle)
    }

    async fn request(
        &self,
        topic: &str,
        message: Value,
        timeout: Duration,
    ) -> Result<Reply, TransportError> {
        self.inner.request(topic, message, timeout).await
    }
}

/// Wraps the bus factory and keeps the counts of every transport it hands out.
pub struct CountingFactory {
    inner: BusTransportFactory,
    created: Mutex<Vec<Arc<TransportCounts>>>,
}

impl CountingFactory {
    /// Counts of the most recently connected transport.
    pub fn last(&self) -> Arc<TransportCounts> {
        self.created.lock().last().cloned().unwrap()
    }
}

impl TransportFactory for CountingFactory {
    fn connect(&self, address: &str) -> Result<Arc<dyn Transport>, TransportError> {
        let counts = Arc::new(TransportCounts::default());
        self.created.lock().push(counts.clone());
        Ok(Arc::new(CountingTransport {
            inner: self.inner.connect(address)?,
            counts,
        }))
    }
}

// =============================================================================
// HARNESS
// =============================================================================

/// Node manager over the in-memory bus and real HTTP.
pub struct Harness {
    pub bus: Arc<InMemoryBus>,
    pub transports: Arc<CountingFactory>,
    pub manager: Arc<NodeManager>,
}

impl Harness {
    pub fn new(watchdog_interval: Duration) -> Self {
        Self::with_config(ManagerConfig {
            watchdog_interval,
            relay_timeout: Duration::from_secs(5),
            ..ManagerConfig::default()
        })
    }

    pub fn with_config(config: ManagerConfig) -> Self {
        let bus = Arc::new(InMemoryBus::new());
        let transports = Arc::new(CountingFactory {
            inner: BusTransportFactory::new(bus.clone()),
            created: Mutex::new(Vec::new()),
        });
        let http = Arc::new(HttpNodeClient::new("127.0.0.1", Duration::from_secs(2)).unwrap());
        let manager = Arc::new(NodeManager::new(
            config,
            transports.clone(),
            http.clone(),
            http,
        ));
        Self {
            bus,
            transports,
            manager,
        }
    }

    /// Harness whose watchdogs never fire during a test.
    pub fn quiet() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

/// Poll `condition` every 20ms until it holds or `timeout` elapses.
pub async fn eventually<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
