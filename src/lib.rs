//! API gateway library: prefix routing to upstream APIs with per-client rate limiting.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
