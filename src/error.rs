//! Per-request failure outcomes and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Terminal outcome of a request the gateway did not forward successfully.
///
/// None of these are retried; the client decides whether to try again.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("No route matches path '{0}'")]
    RouteNotMatched(String),

    #[error("Path '{path}' rejected by filter on route '{prefix}'")]
    PathFilterRejected { prefix: String, path: String },

    #[error("Invalid target URL '{url}': {reason}")]
    InvalidTargetUrl { url: String, reason: String },

    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("Failed to read request body: {0}")]
    BadRequestBody(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl GatewayError {
    /// HTTP status returned to the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotMatched(_) | GatewayError::PathFilterRejected { .. } => {
                StatusCode::NOT_FOUND
            }
            GatewayError::InvalidTargetUrl { .. } | GatewayError::BadRequestBody(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            GatewayError::RouteNotMatched(_) => json!({
                "error": "Not found",
                "message": "No route matches the requested path",
            }),
            GatewayError::PathFilterRejected { .. } => json!({ "error": "Path not allowed" }),
            GatewayError::InvalidTargetUrl { .. } => json!({ "error": "Failed to build target URL" }),
            GatewayError::UpstreamUnreachable(_) => json!({ "error": "Proxy request failed" }),
            GatewayError::BadRequestBody(_) => json!({ "error": "Failed to read request body" }),
            GatewayError::RateLimitExceeded => json!({
                "error": "Rate limit exceeded",
                "message": "Too many requests, please try again later",
            }),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}
