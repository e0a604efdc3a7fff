//! # Control API Flow
//!
//! Drives a live node manager through the HTTP control API with `reqwest`.

#[cfg(test)]
mod tests {
    use crate::fixtures::{FakeNode, Harness};
    use async_trait::async_trait;
    use bridge_core::{ManagerConfig, NodeControl};
    use reqwest::{Method, StatusCode};
    use serde_json::{json, Value};
    use shared_bus::{BusMessage, HandlerOptions, MessageHandler};
    use shared_types::RequestResponse;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    struct Api {
        base: String,
        client: reqwest::Client,
        shutdown: Option<oneshot::Sender<()>>,
    }

    /// Bus responder that answers long after any caller gave up.
    struct Sleeper;

    #[async_trait]
    impl MessageHandler for Sleeper {
        async fn handle(&self, _message: BusMessage) -> Option<Value> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Some(json!({"late": true}))
        }
    }

    impl Api {
        async fn start(harness: &Harness) -> Self {
            Self::start_with_timeout(harness, Duration::from_secs(10)).await
        }

        async fn start_with_timeout(harness: &Harness, request_timeout: Duration) -> Self {
            let control: Arc<dyn NodeControl> = harness.manager.clone();
            let router = bridge_api::router(control, request_timeout);
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr: SocketAddr = listener.local_addr().unwrap();
            let (tx, rx) = oneshot::channel::<()>();
            tokio::spawn(bridge_api::serve(listener, router, async move {
                let _ = rx.await;
            }));
            Self {
                base: format!("http://{addr}"),
                client: reqwest::Client::new(),
                shutdown: Some(tx),
            }
        }

        async fn send(&self, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
            let mut request = self.client.request(method, format!("{}{}", self.base, path));
            if let Some(body) = body {
                request = request.json(&body);
            }
            let response = request.send().await.unwrap();
            let status = response.status();
            (status, response.json().await.unwrap())
        }
    }

    impl Drop for Api {
        fn drop(&mut self) {
            if let Some(tx) = self.shutdown.take() {
                let _ = tx.send(());
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_node_crud_and_relay_over_http() {
        let fake = FakeNode::spawn().await;
        let harness = Harness::quiet();
        let api = Api::start(&harness).await;

        let (status, created) = api
            .send(
                Method::POST,
                "/nodes",
                Some(json!({
                    "port": fake.port(),
                    "health_check": "/health_check",
                    "services": {"greet": {"group": "greeters", "path": "/greet", "timeout": 5}}
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["status"], "healthy");
        assert_eq!(created["publish_port"], fake.port());
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(id.len(), 50);

        let (_, listed) = api.send(Method::GET, "/nodes", None).await;
        assert_eq!(listed["nodes"][0]["id"], id.as_str());

        let (_, services) = api
            .send(Method::GET, &format!("/nodes/{id}/services"), None)
            .await;
        assert_eq!(
            services,
            json!({"services": {"greet": {"group": "greeters", "path": "/greet", "timeout": 5}}})
        );

        let (status, slot) = api
            .send(
                Method::POST,
                &format!("/nodes/{id}/slots"),
                Some(json!({"topic": "user.created", "group": "audit", "path": "/audit"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(slot, json!({"status": "ok"}));

        let (_, described) = api.send(Method::GET, &format!("/nodes/{id}"), None).await;
        assert_eq!(described["node"]["port"], fake.port());
        assert_eq!(described["node"]["slots"][0]["topic"], "user.created");

        let (status, relayed) = api
            .send(
                Method::POST,
                &format!("/request/{id}"),
                Some(json!({"topic": "greet", "message": {"name": "Ann"}, "timeout": 2})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            relayed,
            json!({"messages": {"greeting": "Hello Ann"}, "code": 200, "length": 1})
        );

        let (status, deleted) = api.send(Method::DELETE, &format!("/nodes/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted, json!({"status": "ok"}));

        let (status, missing) = api.send(Method::GET, &format!("/nodes/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(missing, json!({"status": format!("Node not found: {id}")}));

        // Deleting again is still a success.
        let (status, _) = api.send(Method::DELETE, &format!("/nodes/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_relay_longer_than_api_timeout_answers_empty() {
        let fake = FakeNode::spawn().await;
        let harness = Harness::with_config(ManagerConfig {
            watchdog_interval: Duration::from_secs(3600),
            max_relay_timeout: Duration::from_secs(1),
            ..ManagerConfig::default()
        });
        let api = Api::start_with_timeout(&harness, Duration::from_secs(2)).await;
        let node = harness.manager.create(fake.description()).await.unwrap();

        let responder = harness.bus.connect("slow-responder");
        responder.start();
        responder
            .reply_to(
                "slow",
                Arc::new(Sleeper),
                HandlerOptions::new("", Duration::from_secs(60)),
            )
            .unwrap();

        let (status, body) = api
            .send(
                Method::POST,
                &format!("/request/{}", node.id()),
                Some(json!({"topic": "slow", "message": {}, "timeout": 5})),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        let response: RequestResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response, RequestResponse::default());

        harness.manager.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_create_against_closed_port_is_bad_gateway() {
        let harness = Harness::quiet();
        let api = Api::start(&harness).await;

        let port = crate::fixtures::closed_port().await;
        let (status, body) = api
            .send(Method::POST, "/nodes", Some(json!({"port": port})))
            .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_ne!(body["status"], "ok");
        assert!(harness.manager.list_nodes().is_empty());
    }
}
