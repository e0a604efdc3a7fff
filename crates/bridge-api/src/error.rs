//! API error mapping.
//!
//! Every failure answers with the same `{"status": <error text>}` envelope as
//! a success; only the HTTP status code differs.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bridge_core::ProxyError;
use shared_types::StatusResponse;
use thiserror::Error;

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The core rejected the operation.
    #[error(transparent)]
    Proxy(#[from] ProxyError),

    /// The request body did not decode.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Proxy(ProxyError::NodeNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Proxy(
                ProxyError::SubscriptionFailure { .. }
                | ProxyError::ProbeUnreachable { .. }
                | ProxyError::ProbeUnhealthy { .. },
            ) => StatusCode::BAD_GATEWAY,
            Self::Proxy(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = StatusResponse {
            status: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
