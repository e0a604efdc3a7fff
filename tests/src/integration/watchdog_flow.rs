//! # Watchdog Flow
//!
//! The per-node watchdog against a real HTTP node:
//!
//! 1. Health path answers not-OK → node suspended once, status `unreachable`
//! 2. Health path answers OK again → node resumed, requests answered again
//! 3. Listen port closed → status `dirty`, node evicted from the registry

#[cfg(test)]
mod tests {
    use crate::fixtures::{closed_port, eventually, FakeNode, Harness};
    use bridge_core::{HealthStatus, NodeControl, NodeDescription, ProxyError};
    use serde_json::json;
    use shared_types::{Request, RequestResponse};
    use std::time::Duration;

    const INTERVAL: Duration = Duration::from_millis(100);
    const BOUND: Duration = Duration::from_secs(10);

    fn greet(name: &str) -> Request {
        Request {
            topic: "greet".into(),
            composition: json!(null),
            message: json!({"name": name}),
            timeout: 1,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unhealthy_node_is_stopped_once_then_resumed() {
        let fake = FakeNode::spawn().await;
        let harness = Harness::new(INTERVAL);
        let node = harness.manager.create(fake.description()).await.unwrap();
        let counts = harness.transports.last();
        assert_eq!(node.status(), HealthStatus::Healthy);
        assert_eq!(counts.starts(), 1);

        fake.set_healthy(false);
        assert!(eventually(BOUND, || node.status() == HealthStatus::Unreachable).await);

        // Several more unhealthy probes must not stop it again.
        tokio::time::sleep(INTERVAL * 4).await;
        assert_eq!(node.status(), HealthStatus::Unreachable);
        assert_eq!(counts.stops(), 1);
        assert!(!node.is_running());

        let silent = harness.manager.request(node.id(), greet("Ann")).await.unwrap();
        assert_eq!(silent, RequestResponse::default());

        fake.set_healthy(true);
        assert!(eventually(BOUND, || node.status() == HealthStatus::Healthy).await);
        assert_eq!(counts.starts(), 2);
        assert_eq!(counts.stops(), 1);

        let answered = harness.manager.request(node.id(), greet("Ann")).await.unwrap();
        assert_eq!(answered.messages, json!({"greeting": "Hello Ann"}));

        harness.manager.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_closed_port_evicts_node() {
        let mut fake = FakeNode::spawn().await;
        let harness = Harness::new(INTERVAL);
        let node = harness.manager.create(fake.description()).await.unwrap();
        let id = node.id().clone();

        fake.close().await;

        assert!(eventually(BOUND, || !harness.manager.registry().contains(&id)).await);
        assert_eq!(node.status(), HealthStatus::Dirty);
        assert!(node.is_cancelled());
        assert!(matches!(
            harness.manager.get_node(&id),
            Err(ProxyError::NodeNotFound(_))
        ));
        assert!(eventually(BOUND, || harness.manager.active_watchdogs() == 0).await);
        assert!(harness.manager.list_nodes().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_create_on_closed_port_fails() {
        let harness = Harness::quiet();
        let description = NodeDescription {
            port: closed_port().await,
            ..NodeDescription::default()
        };

        let err = harness.manager.create(description).await.unwrap_err();
        assert!(matches!(err, ProxyError::ProbeUnreachable { .. }));
        assert!(harness.manager.registry().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unhealthy_at_creation_is_registered_unreachable() {
        let fake = FakeNode::spawn().await;
        fake.set_healthy(false);
        let harness = Harness::quiet();

        let snapshot = harness
            .manager
            .create_node(fake.description())
            .await
            .unwrap();

        assert_eq!(snapshot.status, HealthStatus::Unreachable);
        assert_eq!(snapshot.publish_port, fake.port());
        assert!(harness
            .manager
            .list_services(&snapshot.id)
            .unwrap()
            .is_empty());

        harness.manager.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_delete_stops_watchdog() {
        let fake = FakeNode::spawn().await;
        let harness = Harness::new(INTERVAL);
        let node = harness.manager.create(fake.description()).await.unwrap();
        let counts = harness.transports.last();

        harness.manager.delete_node(node.id()).await.unwrap();

        assert!(node.is_cancelled());
        assert!(eventually(BOUND, || harness.manager.active_watchdogs() == 0).await);
        fake.set_healthy(false);
        tokio::time::sleep(INTERVAL * 3).await;
        // Only the stop issued by the delete itself.
        assert_eq!(counts.stops(), 1);
    }
}
