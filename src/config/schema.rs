//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::security::identity::IdentifierMode;

/// Root configuration for the API gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Deployment environment, reported on `/` (e.g. "development").
    pub environment: String,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Proxy route definitions.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Global rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request hardening settings.
    pub security: SecurityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            listener: ListenerConfig::default(),
            routes: default_routes(DEFAULT_PUBLIC_API_URL, DEFAULT_PRIVATE_API_URL),
            timeouts: TimeoutConfig::default(),
            rate_limit: RateLimitConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

pub const DEFAULT_PUBLIC_API_URL: &str = "http://localhost:5050";
pub const DEFAULT_PRIVATE_API_URL: &str = "http://localhost:5555";

/// The stock route set: one prefix per backing API.
pub fn default_routes(public_api_url: &str, private_api_url: &str) -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("/private", private_api_url).with_change_origin(true),
        RouteConfig::new("/public", public_api_url).with_change_origin(true),
    ]
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Take the client IP from `X-Forwarded-For` / `X-Real-IP` when present.
    /// Only enable behind a proxy that overwrites these headers.
    pub trust_forwarded_headers: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            trust_forwarded_headers: false,
        }
    }
}

/// A single prefix route forwarding to one upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path prefix the route is mounted at (e.g. "/public").
    pub prefix: String,

    /// Upstream base URL the stripped path is appended to.
    pub target: String,

    /// Rewrite the outbound `Host` header to the target's authority.
    #[serde(default)]
    pub change_origin: bool,

    /// Ordered literal substring replacements applied to the stripped path.
    #[serde(default)]
    pub path_rewrite: Vec<RewriteRuleConfig>,

    /// Regex the stripped path must match, otherwise 404.
    #[serde(default)]
    pub path_filter: Option<String>,

    /// Optional per-route fixed-window limit.
    #[serde(default)]
    pub rate_limit: Option<FixedWindowConfig>,
}

impl RouteConfig {
    pub fn new(prefix: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            target: target.into(),
            change_origin: false,
            path_rewrite: Vec::new(),
            path_filter: None,
            rate_limit: None,
        }
    }

    pub fn with_change_origin(mut self, change_origin: bool) -> Self {
        self.change_origin = change_origin;
        self
    }

    pub fn with_rewrite(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.path_rewrite.push(RewriteRuleConfig {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn with_path_filter(mut self, pattern: impl Into<String>) -> Self {
        self.path_filter = Some(pattern.into());
        self
    }

    pub fn with_rate_limit(mut self, max_requests: u32, window_secs: u64) -> Self {
        self.rate_limit = Some(FixedWindowConfig {
            max_requests,
            window_secs,
        });
        self
    }
}

/// One `from -> to` path rewrite.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RewriteRuleConfig {
    pub from: String,
    pub to: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream call timeout (connect until response headers) in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { upstream_secs: 30 }
    }
}

/// Which limiter guards all traffic.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LimiterStrategy {
    #[default]
    FixedWindow,
    TokenBucket,
}

/// Global rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable the global limiter.
    pub enabled: bool,

    /// Limiter algorithm.
    pub strategy: LimiterStrategy,

    /// How clients are told apart.
    pub identifier: IdentifierMode,

    /// LAN mode: identify clients by IP + session instead of IP alone.
    pub lan_mode: bool,

    /// Fixed-window settings.
    pub fixed_window: FixedWindowConfig,

    /// Token-bucket settings.
    pub token_bucket: TokenBucketConfig,
}

impl RateLimitConfig {
    /// Identifier mode after applying the LAN-mode switch.
    pub fn effective_mode(&self) -> IdentifierMode {
        if self.lan_mode {
            IdentifierMode::IpAndSession
        } else {
            self.identifier
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: LimiterStrategy::FixedWindow,
            identifier: IdentifierMode::IpOnly,
            lan_mode: false,
            fixed_window: FixedWindowConfig::default(),
            token_bucket: TokenBucketConfig::default(),
        }
    }
}

/// Fixed-window limiter parameters.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct FixedWindowConfig {
    /// Requests allowed per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for FixedWindowConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
        }
    }
}

/// Token-bucket limiter parameters.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TokenBucketConfig {
    /// Tokens added per refill interval.
    pub rate: u32,

    /// Bucket capacity.
    pub burst: u32,

    /// Refill interval in seconds.
    pub interval_secs: u64,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self {
            rate: 60,
            burst: 20,
            interval_secs: 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Request hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,

    /// Emit permissive CORS headers.
    pub cors_enabled: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            cors_enabled: true,
        }
    }
}
