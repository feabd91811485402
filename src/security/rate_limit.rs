//! Rate limiting middleware and the limiter contract.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;
use crate::observability::metrics;
use crate::security::identity::{ClientInfo, ClientKey, IdentifierMode};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Quota state reported to the client alongside a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
    /// Window reset as seconds since the Unix epoch.
    pub reset_epoch_secs: u64,
}

impl Quota {
    /// Quota whose window resets `reset_in` from now.
    pub fn new(limit: u32, remaining: u32, reset_in: Duration) -> Self {
        let reset_epoch_secs = (SystemTime::now() + reset_in)
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self {
            limit,
            remaining,
            reset_epoch_secs,
        }
    }

    /// Write the `X-RateLimit-*` headers.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(self.reset_epoch_secs));
    }

}

/// Response extension set when a route limiter wrote the quota headers.
///
/// The global middleware leaves headers alone only when this is present;
/// otherwise it overwrites whatever the upstream sent.
#[derive(Debug, Clone, Copy)]
pub struct RouteQuotaApplied;

/// Outcome of one admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Identifier the request was charged to.
    pub key: String,
    /// Present for limiters that expose quota headers.
    pub quota: Option<Quota>,
}

/// An admission-control gate keyed by client identifier.
pub trait RateLimiter: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &str;

    /// Decide on one request from `client` at time `now`.
    fn check_at(&self, client: &ClientInfo, now: Instant) -> Decision;

    fn check(&self, client: &ClientInfo) -> Decision {
        self.check_at(client, Instant::now())
    }

    fn mode(&self) -> IdentifierMode;

    /// Switch identifier mode. All existing client state is discarded.
    fn set_mode(&self, mode: IdentifierMode);

    /// Drop state that no longer affects decisions. Returns entries removed.
    fn sweep_at(&self, now: Instant) -> usize;

    /// How often the background sweep should run.
    fn sweep_period(&self) -> Duration;

    /// Number of clients currently tracked.
    fn tracked_clients(&self) -> usize;
}

/// State for [`rate_limit_middleware`].
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<dyn RateLimiter>,
    pub trust_forwarded_headers: bool,
}

/// Middleware gating every request through a limiter.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let client = ClientInfo::from_request(&request, state.trust_forwarded_headers);
    let decision = state.limiter.check(&client);

    if !decision.allowed {
        tracing::warn!(
            limiter = %state.limiter.name(),
            client = %decision.key,
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        metrics::record_rate_limited(state.limiter.name());
        let mut response = GatewayError::RateLimitExceeded.into_response();
        if let Some(quota) = decision.quota {
            quota.apply(response.headers_mut());
        }
        return response;
    }

    request.extensions_mut().insert(ClientKey(decision.key));

    let mut response = next.run(request).await;
    if let Some(quota) = decision.quota {
        if response.extensions().get::<RouteQuotaApplied>().is_none() {
            quota.apply(response.headers_mut());
        }
    }
    response
}
