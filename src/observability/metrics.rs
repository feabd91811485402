//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_rate_limited_total` (counter): denials by limiter
//! - `gateway_limiter_tracked_clients` (gauge): clients held per limiter
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("route", route.to_string()),
    ];
    counter!("gateway_requests_total", &labels).increment(1);
    histogram!("gateway_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

/// Record a rate-limit denial.
pub fn record_rate_limited(limiter: &str) {
    counter!("gateway_rate_limited_total", "limiter" => limiter.to_string()).increment(1);
}

/// Record how many clients a limiter currently tracks.
pub fn record_limiter_size(limiter: &str, tracked: usize) {
    gauge!("gateway_limiter_tracked_clients", "limiter" => limiter.to_string()).set(tracked as f64);
}
