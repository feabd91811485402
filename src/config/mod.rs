//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! built-in defaults
//!     → loader.rs (optional TOML file, then environment overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → consumed once at startup to build routes and limiters
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no runtime reconfiguration
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    FixedWindowConfig, GatewayConfig, LimiterStrategy, ListenerConfig, LogFormat,
    ObservabilityConfig, RateLimitConfig, RewriteRuleConfig, RouteConfig, SecurityConfig,
    TimeoutConfig, TokenBucketConfig,
};
