//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → route.rs (compile path filters)
//!     → table.rs (sort longest prefix first, reject duplicates, mount)
//!     → Freeze as immutable RouteTable
//!
//! Incoming Request (path, query)
//!     → table.rs (lookup)
//!     → matcher.rs (segment-bounded prefix scan, path filter)
//!     → target.rs (strip, rewrite, reattach query)
//!     → Return: upstream URI, or NotFound / InvalidTargetUrl
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by prefix length)
//! - Filtered routes fail closed

pub mod matcher;
pub mod route;
pub mod table;
pub mod target;

pub use matcher::RouteMatch;
pub use route::{RewriteRule, RouteDefinition};
pub use table::{Mount, MountKind, RouteTable, RouteTableError};
pub use target::resolve_target;
