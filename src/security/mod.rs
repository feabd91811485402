//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → identity.rs (derive client identifier for the limiter's mode)
//!     → rate_limit.rs (global gate: fixed_window.rs or token_bucket.rs)
//!     → Pass to routing
//!     → fixed_window.rs again for routes with their own limit
//!
//! Background:
//!     sweeper.rs → store.rs (drop state that no longer matters)
//! ```
//!
//! # Design Decisions
//! - Each limiter owns its state behind one lock; no global singletons
//! - Fail closed: a denied request never reaches routing
//! - No trust in client input (forwarded headers opt-in)

pub mod fixed_window;
pub mod identity;
pub mod rate_limit;
pub mod store;
pub mod sweeper;
pub mod token_bucket;

pub use fixed_window::FixedWindowLimiter;
pub use identity::{AuthenticatedUser, ClientInfo, ClientKey, IdentifierMode};
pub use rate_limit::{rate_limit_middleware, Decision, Quota, RateLimitState, RateLimiter, RouteQuotaApplied};
pub use sweeper::SweepHandle;
pub use token_bucket::TokenBucketLimiter;
