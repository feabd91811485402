//! Target URL resolution.
//!
//! Turns a matched route and the inbound path/query into the upstream URI.
//! Rewrites are literal substring replacements applied in declaration order;
//! each rule sees the output of the previous one. Re-applying the rewrites is
//! only a no-op when no rule's replacement contains another rule's pattern.

use axum::http::Uri;
use url::Url;

use crate::error::GatewayError;
use crate::routing::route::{RewriteRule, RouteDefinition};

/// Apply rewrite rules to `path`, in order.
pub fn apply_rewrites(path: &str, rules: &[RewriteRule]) -> String {
    rules
        .iter()
        .filter(|rule| !rule.from.is_empty())
        .fold(path.to_string(), |acc, rule| acc.replace(&rule.from, &rule.to))
}

/// Build the upstream URI for a matched route.
///
/// `forwarded_path` is the prefix-stripped path; `query` is the raw inbound
/// query string, reattached without re-encoding.
pub fn resolve_target(
    route: &RouteDefinition,
    forwarded_path: &str,
    query: Option<&str>,
) -> Result<Uri, GatewayError> {
    let path = apply_rewrites(forwarded_path, route.path_rewrite());

    let mut target = format!("{}{}", route.target(), path);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }

    let invalid = |reason: String| GatewayError::InvalidTargetUrl {
        url: target.clone(),
        reason,
    };

    let parsed = Url::parse(&target).map_err(|e| invalid(e.to_string()))?;
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    target
        .parse::<Uri>()
        .map_err(|e| invalid(e.to_string()))
}
