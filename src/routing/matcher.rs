//! Path matching logic.
//!
//! # Responsibilities
//! - Decide whether a prefix owns a request path (segment-bounded)
//! - Scan routes in table order, first match wins
//! - Enforce path filters, failing closed
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - `/api` owns `/api` and `/api/...`, never `/apiary`
//! - A filter rejection ends the lookup; no fallback to shorter prefixes

use crate::error::GatewayError;
use crate::routing::route::RouteDefinition;

/// A route selected for a request path.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    /// The matched route.
    pub route: &'a RouteDefinition,
    /// Path to forward, with the prefix stripped and a leading `/`.
    pub forwarded_path: String,
}

/// Remainder of `path` below `prefix`, or `None` if `prefix` does not own it.
///
/// The root prefix owns every path and strips nothing.
pub fn strip_prefix<'a>(prefix: &str, path: &'a str) -> Option<&'a str> {
    if prefix == "/" {
        return Some(path);
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Left-pad a stripped remainder so it is an absolute path.
pub fn normalize_remainder(remainder: &str) -> String {
    if remainder.starts_with('/') {
        remainder.to_string()
    } else {
        format!("/{}", remainder)
    }
}

/// Find the route owning `path` among `routes`, which must already be in
/// longest-prefix-first order.
pub fn match_path<'a>(routes: &'a [RouteDefinition], path: &str) -> Result<RouteMatch<'a>, GatewayError> {
    for route in routes {
        let Some(remainder) = strip_prefix(route.prefix(), path) else {
            continue;
        };

        let forwarded_path = normalize_remainder(remainder);

        if let Some(filter) = route.path_filter() {
            if !filter.is_match(&forwarded_path) {
                return Err(GatewayError::PathFilterRejected {
                    prefix: route.prefix().to_string(),
                    path: path.to_string(),
                });
            }
        }

        return Ok(RouteMatch {
            route,
            forwarded_path,
        });
    }

    Err(GatewayError::RouteNotMatched(path.to_string()))
}
