//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Build the route table and limiters from configuration
//! - Create the Axum router with the gateway's own endpoints
//! - Wire up middleware (request ID, tracing, CORS, rate limiting)
//! - Dispatch every other request to the matching upstream
//! - Run limiter sweeps for the lifetime of the server

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, Method, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{GatewayConfig, LimiterStrategy};
use crate::error::GatewayError;
use crate::http::proxy::ProxyExecutor;
use crate::http::request::{request_id, MakeGatewayRequestId, ProxyRequest};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing::{resolve_target, RouteTable, RouteTableError};
use crate::security::{
    rate_limit_middleware, ClientInfo, ClientKey, FixedWindowLimiter, IdentifierMode, RateLimitState,
    RateLimiter, RouteQuotaApplied, SweepHandle, TokenBucketLimiter,
};

const SERVICE_NAME: &str = "api-gateway";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    /// Per-route limiters keyed by route prefix.
    pub route_limiters: Arc<HashMap<String, Arc<dyn RateLimiter>>>,
    pub executor: ProxyExecutor,
    pub environment: String,
    pub max_body_size: usize,
    pub trust_forwarded_headers: bool,
    /// Identifier mode used to label clients in logs.
    pub identifier_mode: IdentifierMode,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    global_limiter: Option<Arc<dyn RateLimiter>>,
    route_limiters: Arc<HashMap<String, Arc<dyn RateLimiter>>>,
}

impl HttpServer {
    /// Create a server from a validated configuration.
    pub fn new(config: &GatewayConfig) -> Result<Self, RouteTableError> {
        let routes = Arc::new(RouteTable::from_config(&config.routes)?);
        for mount in routes.mounts() {
            tracing::info!(pattern = %mount.pattern(), kind = ?mount.kind, "Route mounted");
        }

        let mode = config.rate_limit.effective_mode();
        let global_limiter: Option<Arc<dyn RateLimiter>> = if config.rate_limit.enabled {
            let limiter: Arc<dyn RateLimiter> = match config.rate_limit.strategy {
                LimiterStrategy::FixedWindow => Arc::new(FixedWindowLimiter::from_config(
                    "global",
                    &config.rate_limit.fixed_window,
                    mode,
                )),
                LimiterStrategy::TokenBucket => Arc::new(TokenBucketLimiter::from_config(
                    "global",
                    &config.rate_limit.token_bucket,
                    mode,
                )),
            };
            tracing::info!(
                strategy = ?config.rate_limit.strategy,
                identifier = ?mode,
                "Global rate limiter enabled"
            );
            Some(limiter)
        } else {
            None
        };

        let mut route_limiters: HashMap<String, Arc<dyn RateLimiter>> = HashMap::new();
        for route in routes.routes() {
            if let Some(limit) = route.rate_limit() {
                let name = format!("route:{}", route.prefix());
                let limiter: Arc<dyn RateLimiter> = Arc::new(FixedWindowLimiter::from_config(name, limit, mode));
                route_limiters.insert(route.prefix().to_string(), limiter);
            }
        }
        let route_limiters = Arc::new(route_limiters);

        let state = AppState {
            routes,
            route_limiters: route_limiters.clone(),
            executor: ProxyExecutor::new(Duration::from_secs(config.timeouts.upstream_secs)),
            environment: config.environment.clone(),
            max_body_size: config.security.max_body_size,
            trust_forwarded_headers: config.listener.trust_forwarded_headers,
            identifier_mode: mode,
        };

        let router = Self::build_router(config, state, global_limiter.clone());
        Ok(Self {
            router,
            global_limiter,
            route_limiters,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(
        config: &GatewayConfig,
        state: AppState,
        global_limiter: Option<Arc<dyn RateLimiter>>,
    ) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/", get(root_handler))
            .fallback(proxy_handler)
            .method_not_allowed_fallback(proxy_handler)
            .with_state(state);

        if let Some(limiter) = global_limiter {
            let rate_state = RateLimitState {
                limiter,
                trust_forwarded_headers: config.listener.trust_forwarded_headers,
            };
            router = router.layer(middleware::from_fn_with_state(rate_state, rate_limit_middleware));
        }

        if config.security.cors_enabled {
            router = router
                .layer(middleware::from_fn(options_no_content))
                .layer(cors_layer());
        }

        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %request_id(request),
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeGatewayRequestId))
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn global_limiter(&self) -> Option<&Arc<dyn RateLimiter>> {
        self.global_limiter.as_ref()
    }

    pub fn route_limiter(&self, prefix: &str) -> Option<&Arc<dyn RateLimiter>> {
        self.route_limiters.get(prefix)
    }

    /// Run the server until `shutdown` is triggered.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;

        let _sweeps: Vec<SweepHandle> = self
            .global_limiter
            .iter()
            .chain(self.route_limiters.values())
            .map(|limiter| SweepHandle::spawn(limiter, shutdown.subscribe()))
            .collect();

        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let mut signal = shutdown.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = signal.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::CONTENT_LENGTH,
            header::ACCEPT_ENCODING,
            HeaderName::from_static("x-csrf-token"),
            header::AUTHORIZATION,
        ])
}

/// Answer every OPTIONS request locally. Preflights never get here;
/// `CorsLayer` answers those itself and decorates this response too.
async fn options_no_content(request: Request<Body>, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    next.run(request).await
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}

async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "message": "API Gateway is running",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.environment,
    }))
}

/// Main proxy handler.
/// Looks up the route, applies the route limiter, and forwards the request.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request);
    let path = request.uri().path().to_string();
    let method = request.method().to_string();

    let client_key = match request.extensions().get::<ClientKey>() {
        Some(key) => key.0.clone(),
        None => ClientInfo::from_request(&request, state.trust_forwarded_headers)
            .identifier(state.identifier_mode),
    };

    // 1. Match route
    let matched = match state.routes.lookup(&path) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(request_id = %request_id, client = %client_key, path = %path, error = %e, "No route for request");
            metrics::record_request(&method, e.status_code().as_u16(), "none", start_time);
            return e.into_response();
        }
    };
    let prefix = matched.route.prefix().to_string();

    // 2. Route limiter
    let mut route_quota = None;
    if let Some(limiter) = state.route_limiters.get(&prefix) {
        let client = ClientInfo::from_request(&request, state.trust_forwarded_headers);
        let decision = limiter.check(&client);
        if !decision.allowed {
            tracing::warn!(
                request_id = %request_id,
                limiter = %limiter.name(),
                client = %decision.key,
                path = %path,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited(limiter.name());
            metrics::record_request(&method, 429, &prefix, start_time);
            let mut response = GatewayError::RateLimitExceeded.into_response();
            if let Some(quota) = decision.quota {
                quota.apply(response.headers_mut());
                response.extensions_mut().insert(RouteQuotaApplied);
            }
            return response;
        }
        route_quota = decision.quota;
    }

    // 3. Resolve target
    let target = match resolve_target(matched.route, &matched.forwarded_path, request.uri().query()) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, client = %client_key, path = %path, error = %e, "Target resolution failed");
            metrics::record_request(&method, e.status_code().as_u16(), &prefix, start_time);
            return e.into_response();
        }
    };
    let change_origin = matched.route.change_origin();

    tracing::debug!(request_id = %request_id, path = %path, target = %target, "Proxying request");

    // 4. Capture request
    let proxy_request = match ProxyRequest::from_request(request, state.max_body_size).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(request_id = %request_id, client = %client_key, path = %path, error = %e, "Failed to read request body");
            metrics::record_request(&method, e.status_code().as_u16(), &prefix, start_time);
            return e.into_response();
        }
    };

    // 5. Forward
    let target_str = target.to_string();
    let mut response = match state
        .executor
        .forward(proxy_request, target, change_origin, &request_id)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                client = %client_key,
                path = %path,
                target = %target_str,
                error = %e,
                "Upstream request failed"
            );
            metrics::record_request(&method, e.status_code().as_u16(), &prefix, start_time);
            return e.into_response();
        }
    };

    let status = response.status();
    if status.is_server_error() {
        tracing::warn!(
            request_id = %request_id,
            client = %client_key,
            path = %path,
            status = %status,
            "Upstream returned server error"
        );
    }
    metrics::record_request(&method, status.as_u16(), &prefix, start_time);

    if let Some(quota) = route_quota {
        quota.apply(response.headers_mut());
        response.extensions_mut().insert(RouteQuotaApplied);
    }
    response
}
