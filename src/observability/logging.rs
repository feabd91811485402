//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Select human or JSON output
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - JSON format for production, pretty format for development

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Default filter directives for a configured level.
pub fn default_directives(level: &str) -> String {
    format!("api_gateway={level},tower_http={level}")
}

/// Install the global subscriber. Call once, at startup.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
