//! Upstream request execution.
//!
//! # Responsibilities
//! - Send the outbound request to the resolved target
//! - Bound the call with a timeout
//! - Map transport failures to `UpstreamUnreachable`
//!
//! # Design Decisions
//! - No retries; a failed call is a terminal 502
//! - One deadline covers the whole exchange: connect, response headers and
//!   the streamed body

use std::time::Duration;

use axum::{
    body::Body,
    http::{Response, Uri},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::error::GatewayError;
use crate::http::request::ProxyRequest;
use crate::http::response::relay_response;

/// Forwards captured requests to upstreams.
#[derive(Clone)]
pub struct ProxyExecutor {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl ProxyExecutor {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Forward `request` to `target` and relay the upstream response.
    pub async fn forward(
        &self,
        request: ProxyRequest,
        target: Uri,
        change_origin: bool,
        request_id: &str,
    ) -> Result<Response<Body>, GatewayError> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        let outbound = request.into_upstream(target, change_origin);

        match tokio::time::timeout_at(deadline, self.client.request(outbound)).await {
            Ok(Ok(response)) => Ok(relay_response(response.map(Body::new), request_id, deadline)),
            Ok(Err(e)) => Err(GatewayError::UpstreamUnreachable(e.to_string())),
            Err(_) => Err(GatewayError::UpstreamUnreachable(format!(
                "no response within {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}
