//! Route table construction and lookup.
//!
//! # Responsibilities
//! - Order routes longest prefix first
//! - Reject duplicate prefixes
//! - Record exact and wildcard mounts, suppressing wildcards that would
//!   shadow a more specific route
//! - Look up the route for a request path
//!
//! # Design Decisions
//! - Built once at startup, immutable afterwards (shared without locks)
//! - Sort is stable: equal-length prefixes keep declaration order
//! - O(n) prefix scan (acceptable for typical route counts)

use thiserror::Error;

use crate::config::RouteConfig;
use crate::error::GatewayError;
use crate::routing::matcher::{match_path, RouteMatch};
use crate::routing::route::RouteDefinition;

/// Error building a route table.
#[derive(Debug, Error)]
pub enum RouteTableError {
    #[error("duplicate route prefix '{0}'")]
    DuplicatePrefix(String),

    #[error("invalid path filter for route '{prefix}': {source}")]
    InvalidPathFilter {
        prefix: String,
        #[source]
        source: regex::Error,
    },
}

/// How a route is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    /// The prefix itself.
    Exact,
    /// Everything below the prefix (`prefix/*`).
    Wildcard,
}

/// A registered mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub prefix: String,
    pub kind: MountKind,
}

impl Mount {
    /// Human-readable pattern, e.g. `/public/*`.
    pub fn pattern(&self) -> String {
        match self.kind {
            MountKind::Exact => self.prefix.clone(),
            MountKind::Wildcard => format!("{}/*", self.prefix.trim_end_matches('/')),
        }
    }
}

/// Ordered, conflict-resolved set of routes.
#[derive(Debug)]
pub struct RouteTable {
    routes: Vec<RouteDefinition>,
    mounts: Vec<Mount>,
}

impl RouteTable {
    /// Build a table from route definitions in any order.
    pub fn build(mut routes: Vec<RouteDefinition>) -> Result<Self, RouteTableError> {
        routes.sort_by(|a, b| b.prefix().len().cmp(&a.prefix().len()));

        for (i, route) in routes.iter().enumerate() {
            if routes[..i].iter().any(|other| other.prefix() == route.prefix()) {
                return Err(RouteTableError::DuplicatePrefix(route.prefix().to_string()));
            }
        }

        let mut mounts = Vec::with_capacity(routes.len() * 2);
        for route in &routes {
            mounts.push(Mount {
                prefix: route.prefix().to_string(),
                kind: MountKind::Exact,
            });

            if wildcard_allowed(route.prefix(), &routes) {
                mounts.push(Mount {
                    prefix: route.prefix().to_string(),
                    kind: MountKind::Wildcard,
                });
            } else {
                tracing::debug!(
                    prefix = %route.prefix(),
                    "Wildcard mount suppressed; a more specific route exists"
                );
            }
        }

        Ok(Self { routes, mounts })
    }

    /// Build a table straight from configuration.
    pub fn from_config(configs: &[RouteConfig]) -> Result<Self, RouteTableError> {
        let routes = configs
            .iter()
            .map(RouteDefinition::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(routes)
    }

    /// Routes in evaluation order.
    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    /// Registered mounts in evaluation order.
    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    /// Whether `prefix/*` was mounted for the given route.
    pub fn has_wildcard_mount(&self, prefix: &str) -> bool {
        self.mounts
            .iter()
            .any(|m| m.kind == MountKind::Wildcard && m.prefix == prefix)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the route for a request path.
    pub fn lookup(&self, path: &str) -> Result<RouteMatch<'_>, GatewayError> {
        match_path(&self.routes, path)
    }
}

/// A wildcard for `prefix` is allowed only when no other route lives below it.
fn wildcard_allowed(prefix: &str, routes: &[RouteDefinition]) -> bool {
    let below = format!("{}/", prefix.trim_end_matches('/'));
    !routes
        .iter()
        .any(|other| other.prefix() != prefix && other.prefix().starts_with(&below))
}
