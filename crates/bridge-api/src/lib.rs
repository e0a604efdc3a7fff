//! # Control API
//!
//! HTTP surface over [`NodeControl`]. Thin by intent: handlers decode JSON,
//! call the core and wrap the result in the `{status}` envelope.
//!
//! ## Routes
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST | `/nodes` | create a node |
//! | GET | `/nodes` | list nodes |
//! | GET, DELETE | `/nodes/:id` | describe, delete |
//! | GET, POST, DELETE | `/nodes/:id/services` | list, add, remove services |
//! | GET, POST, DELETE | `/nodes/:id/slots` | list, add, remove slots |
//! | POST | `/request/:id` | relay a request |
//! | GET | `/health` | liveness |

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod handlers;
pub mod middleware;

pub use error::ApiError;
pub use handlers::AppState;
pub use middleware::TracingLayer;

use axum::routing::{get, post};
use axum::Router;
use bridge_core::NodeControl;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

/// Build the control API router.
pub fn router(control: Arc<dyn NodeControl>, request_timeout: Duration) -> Router {
    Router::new()
        .route(
            "/nodes",
            post(handlers::create_node).get(handlers::list_nodes),
        )
        .route(
            "/nodes/:id",
            get(handlers::get_node).delete(handlers::delete_node),
        )
        .route(
            "/nodes/:id/services",
            get(handlers::list_services)
                .post(handlers::add_services)
                .delete(handlers::remove_services),
        )
        .route(
            "/nodes/:id/slots",
            get(handlers::list_slots)
                .post(handlers::add_slot)
                .delete(handlers::remove_slot),
        )
        .route("/request/:id", post(handlers::relay_request))
        .route("/health", get(handlers::health_check))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TracingLayer::new())
        .with_state(control)
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = listener.local_addr()?;
    info!(%addr, "Control API listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Control API stopped");
    Ok(())
}
