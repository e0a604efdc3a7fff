//! # Relay Flow
//!
//! A request published on the bus reaches the node's HTTP handler as an
//! envelope, and the node's answer travels back as the reply.
//!
//! ```text
//! requester ──greet──→ bus ──→ MessageBridge ──POST /greet──→ FakeNode
//!     ↑                                                          │
//!     └─────────────────────── Reply {data, code} ←──────────────┘
//! ```

#[cfg(test)]
mod tests {
    use crate::fixtures::{eventually, FakeNode, Harness};
    use bridge_core::{NodeControl, Slot};
    use serde_json::json;
    use shared_types::{Envelope, Request, RequestResponse, REPLY_OK};
    use std::time::Duration;
    use tokio::time::timeout;

    const BOUND: Duration = Duration::from_secs(10);

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_relayed_request_reaches_node_and_returns_reply() {
        let fake = FakeNode::spawn().await;
        let harness = Harness::quiet();
        let node = harness.manager.create(fake.description()).await.unwrap();

        let request = Request {
            topic: "greet".into(),
            composition: json!(null),
            message: json!({"name": "Ann"}),
            timeout: 2,
        };
        let response = timeout(BOUND, harness.manager.request(node.id(), request))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            response,
            RequestResponse {
                messages: json!({"greeting": "Hello Ann"}),
                code: REPLY_OK,
                length: 1,
            }
        );
        assert_eq!(
            fake.received(),
            vec![(
                "/greet".to_string(),
                json!({"data": {"name": "Ann"}, "handler_path": fake.port()})
            )]
        );

        harness.manager.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_external_requester_on_the_bus() {
        let fake = FakeNode::spawn().await;
        let harness = Harness::quiet();
        harness.manager.create(fake.description()).await.unwrap();

        let client = harness.bus.connect("client");
        client.start();
        let envelope = Envelope::new(json!({"name": "Bob"}), "client");
        let reply = timeout(
            BOUND,
            client.request("greet", envelope.to_value().unwrap(), Duration::from_secs(2)),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(reply.is_ok());
        assert_eq!(reply.data, json!({"greeting": "Hello Bob"}));

        harness.manager.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slot_signal_is_forwarded() {
        let fake = FakeNode::spawn().await;
        let harness = Harness::quiet();
        let node = harness.manager.create(fake.description()).await.unwrap();
        harness
            .manager
            .add_slot(
                node.id(),
                Slot {
                    topic: "user.created".into(),
                    group: "audit".into(),
                    path: "/audit".into(),
                    timeout: 5,
                },
            )
            .unwrap();

        let client = harness.bus.connect("client");
        client.start();
        let envelope = Envelope::new(json!({"user": 7}), "client");
        assert_eq!(
            client
                .signal("user.created", envelope.to_value().unwrap())
                .unwrap(),
            1
        );

        assert!(
            eventually(BOUND, || fake
                .received()
                .iter()
                .any(|(path, _)| path == "/audit"))
            .await
        );
        let (_, body) = fake
            .received()
            .into_iter()
            .find(|(path, _)| path == "/audit")
            .unwrap();
        assert_eq!(body, json!({"data": {"user": 7}, "handler_path": "client"}));

        harness.manager.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_request_without_responder_is_empty() {
        let fake = FakeNode::spawn().await;
        let harness = Harness::quiet();
        let node = harness.manager.create(fake.description()).await.unwrap();

        let request = Request {
            topic: "nobody.listens".into(),
            composition: json!(null),
            message: json!({}),
            timeout: 1,
        };
        let response = timeout(BOUND, harness.manager.request(node.id(), request))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response, RequestResponse::default());
        assert!(fake.received().is_empty());

        harness.manager.shutdown().await;
    }
}
