//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request path (http, security):
//!     → tracing events with request_id, client and path fields
//!     → metrics.rs (request counts and latency per route, rate-limit denials)
//!
//! Limiter sweeps:
//!     → metrics.rs (tracked clients per limiter)
//!
//! Sinks:
//!     → logging.rs subscriber writes to stdout (pretty or JSON lines)
//!     → Prometheus exporter, only when metrics_enabled
//! ```

pub mod logging;
pub mod metrics;
