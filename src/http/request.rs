//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4)
//! - Capture the inbound request for forwarding (method, path, headers, body)
//! - Build the outbound upstream request
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Connection-scoped headers are never replayed upstream
//! - The inbound body is read once, bounded by the configured size limit

use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    http::{
        header::{CONNECTION, HOST, TRANSFER_ENCODING},
        HeaderMap, HeaderName, HeaderValue, Method, Request, Uri,
    },
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::GatewayError;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Request headers stripped before forwarding.
pub const EXCLUDED_REQUEST_HEADERS: [HeaderName; 3] = [HOST, CONNECTION, TRANSFER_ENCODING];

/// Generates `x-request-id` values.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeGatewayRequestId;

impl MakeRequestId for MakeGatewayRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request's ID, or `"unknown"` if none was assigned.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// An inbound request captured for forwarding.
#[derive(Debug)]
pub struct ProxyRequest {
    pub method: Method,
    /// Original path and query, for logging.
    pub original_uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub started_at: Instant,
}

impl ProxyRequest {
    /// Read the inbound request, buffering at most `max_body_size` bytes.
    pub async fn from_request(request: Request<Body>, max_body_size: usize) -> Result<Self, GatewayError> {
        let started_at = Instant::now();
        let (parts, body) = request.into_parts();

        let body = axum::body::to_bytes(body, max_body_size)
            .await
            .map_err(|e| GatewayError::BadRequestBody(e.to_string()))?;

        Ok(Self {
            method: parts.method,
            original_uri: parts.uri,
            headers: parts.headers,
            body,
            started_at,
        })
    }

    /// Build the upstream request for `target`.
    ///
    /// With `change_origin`, an inbound `Host` is replaced by the target's
    /// authority; otherwise it is forwarded as received.
    pub fn into_upstream(self, target: Uri, change_origin: bool) -> Request<Body> {
        let host = self.headers.get(HOST).and_then(|original| {
            if change_origin {
                target
                    .authority()
                    .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok())
            } else {
                Some(original.clone())
            }
        });

        let mut outbound = Request::new(Body::from(self.body));
        *outbound.method_mut() = self.method;
        *outbound.uri_mut() = target;

        let headers = outbound.headers_mut();
        for (name, value) in self.headers.iter() {
            if EXCLUDED_REQUEST_HEADERS.contains(name) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }
        if let Some(host) = host {
            headers.insert(HOST, host);
        }

        outbound
    }
}
