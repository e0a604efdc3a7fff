//! Request relay: publish one request on a node's behalf and wait for the reply.
//!
//! Failures never reach the caller. They are logged and the empty
//! [`RequestResponse`] is returned, which callers read as "no answer".

use crate::error::{ProxyError, TransportError};
use crate::service::node::Node;
use shared_types::{Envelope, Request, RequestResponse};
use std::time::Duration;
use tracing::{debug, warn};

/// Issues ad-hoc bus requests through a node's transport.
#[derive(Debug, Clone)]
pub struct RequestRelay {
    default_timeout: Duration,
    max_timeout: Duration,
}

impl RequestRelay {
    /// `default_timeout` applies to requests with `timeout == 0`; no request
    /// waits longer than `max_timeout`.
    pub fn new(default_timeout: Duration, max_timeout: Duration) -> Self {
        Self {
            default_timeout,
            max_timeout,
        }
    }

    /// Publish `request` and return the reply, or the empty response.
    pub async fn relay(&self, node: &Node, request: &Request) -> RequestResponse {
        match self.try_relay(node, request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(node_id = %node.id(), topic = %request.topic, error = %e, "Relay returned no answer");
                RequestResponse::default()
            }
        }
    }

    async fn try_relay(
        &self,
        node: &Node,
        request: &Request,
    ) -> Result<RequestResponse, ProxyError> {
        let transport = node.transport()?;
        let timeout = self.timeout_for(request);

        let payload = Envelope::new(request.message.clone(), node.port())
            .to_value()
            .map_err(|e| TransportError::Rejected {
                topic: request.topic.clone(),
                reason: e.to_string(),
            })?;

        let reply = transport
            .request(&request.topic, payload, timeout)
            .await
            .map_err(|e| match e {
                TransportError::Timeout { topic } => ProxyError::RelayTimeout {
                    topic,
                    timeout_secs: timeout.as_secs(),
                },
                other => ProxyError::Transport(other),
            })?;

        debug!(node_id = %node.id(), topic = %request.topic, code = reply.code, "Relay answered");
        Ok(RequestResponse {
            messages: reply.data,
            code: reply.code,
            length: 1,
        })
    }

    fn timeout_for(&self, request: &Request) -> Duration {
        let requested = if request.timeout == 0 {
            self.default_timeout
        } else {
            Duration::from_secs(request.timeout)
        };
        requested.min(self.max_timeout)
    }
}
