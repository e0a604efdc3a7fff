//! HTTP adapter: health probes and message forwarding over `reqwest`.

use crate::domain::{normalize_path, ProbeOutcome};
use crate::error::{ForwardError, ProbeError};
use crate::ports::{Forwarder, NodeProber};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared_types::Envelope;
use std::time::Duration;
use tracing::debug;

/// Body a healthy node returns from its health path.
const HEALTHY_BODY: &str = "OK";

/// HTTP client for talking to downstream nodes.
#[derive(Debug, Clone)]
pub struct HttpNodeClient {
    client: Client,
    host: String,
    probe_timeout: Duration,
}

impl HttpNodeClient {
    /// Create a client addressing nodes at `host`.
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be built.
    pub fn new(host: impl Into<String>, probe_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().connect_timeout(probe_timeout).build()?;
        Ok(Self {
            client,
            host: host.into(),
            probe_timeout,
        })
    }

    fn base_url(&self, port: &str) -> String {
        format!("http://{}:{}", self.host, port)
    }

    fn url(&self, port: &str, path: &str) -> String {
        format!("{}/{}", self.base_url(port), normalize_path(path))
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .get(url)
            .timeout(self.probe_timeout)
            .send()
            .await
    }
}

#[async_trait]
impl NodeProber for HttpNodeClient {
    async fn check_port(&self, port: &str) -> Result<(), ProbeError> {
        self.get(&self.base_url(port))
            .await
            .map(|_| ())
            .map_err(|e| ProbeError::Unreachable {
                port: port.to_string(),
                reason: e.to_string(),
            })
    }

    async fn probe(&self, port: &str, health_path: &str) -> Result<ProbeOutcome, ProbeError> {
        let request_error = |e: reqwest::Error| ProbeError::Request {
            port: port.to_string(),
            reason: e.to_string(),
        };

        match self.get(&self.base_url(port)).await {
            Ok(_) => {}
            Err(e) if e.is_connect() => {
                debug!(port = port, error = %e, "Listen port closed");
                return Ok(ProbeOutcome::PortClosed);
            }
            Err(e) => return Err(request_error(e)),
        }

        let response = match self.get(&self.url(port, health_path)).await {
            Ok(response) => response,
            Err(e) if e.is_connect() => return Ok(ProbeOutcome::PortClosed),
            Err(e) => return Err(request_error(e)),
        };
        let body = response.text().await.map_err(|e| ProbeError::Body {
            port: port.to_string(),
            reason: e.to_string(),
        })?;

        if body.trim() == HEALTHY_BODY {
            Ok(ProbeOutcome::Healthy)
        } else {
            debug!(port = port, body = %body.trim(), "Health check answered not OK");
            Ok(ProbeOutcome::Unhealthy)
        }
    }
}

#[async_trait]
impl Forwarder for HttpNodeClient {
    async fn forward(
        &self,
        port: &str,
        path: &str,
        envelope: &Envelope,
    ) -> Result<Value, ForwardError> {
        let url = self.url(port, path);
        let response = self
            .client
            .post(&url)
            .json(envelope)
            .send()
            .await
            .map_err(|e| ForwardError::Request {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        response
            .json::<Value>()
            .await
            .map_err(|e| ForwardError::Decode {
                url,
                reason: e.to_string(),
            })
    }
}
