//! Route definitions.
//!
//! # Responsibilities
//! - Hold one prefix route: target, rewrites, filter, origin handling
//! - Compile the optional path filter once, at startup
//!
//! # Design Decisions
//! - Immutable after construction
//! - Identity is the prefix; uniqueness is enforced by the table

use regex::Regex;

use crate::config::{FixedWindowConfig, RouteConfig};
use crate::routing::table::RouteTableError;

/// One literal `from -> to` substitution applied to the forwarded path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    pub from: String,
    pub to: String,
}

/// A prefix route forwarding to one upstream.
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    prefix: String,
    target: String,
    path_rewrite: Vec<RewriteRule>,
    path_filter: Option<Regex>,
    change_origin: bool,
    rate_limit: Option<FixedWindowConfig>,
}

impl RouteDefinition {
    /// Create a plain route with no rewrites, filter or origin change.
    pub fn new(prefix: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            target: target.into(),
            path_rewrite: Vec::new(),
            path_filter: None,
            change_origin: false,
            rate_limit: None,
        }
    }

    /// Build a route from its configuration, compiling the path filter.
    pub fn from_config(config: &RouteConfig) -> Result<Self, RouteTableError> {
        let path_filter = config
            .path_filter
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|source| RouteTableError::InvalidPathFilter {
                prefix: config.prefix.clone(),
                source,
            })?;

        Ok(Self {
            prefix: config.prefix.clone(),
            target: config.target.clone(),
            path_rewrite: config
                .path_rewrite
                .iter()
                .map(|rule| RewriteRule {
                    from: rule.from.clone(),
                    to: rule.to.clone(),
                })
                .collect(),
            path_filter,
            change_origin: config.change_origin,
            rate_limit: config.rate_limit.clone(),
        })
    }

    pub fn with_rewrite(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.path_rewrite.push(RewriteRule {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn with_path_filter(mut self, filter: Regex) -> Self {
        self.path_filter = Some(filter);
        self
    }

    pub fn with_change_origin(mut self, change_origin: bool) -> Self {
        self.change_origin = change_origin;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn path_rewrite(&self) -> &[RewriteRule] {
        &self.path_rewrite
    }

    pub fn path_filter(&self) -> Option<&Regex> {
        self.path_filter.as_ref()
    }

    pub fn change_origin(&self) -> bool {
        self.change_origin
    }

    /// Per-route fixed-window limit, if one is configured.
    pub fn rate_limit(&self) -> Option<&FixedWindowConfig> {
        self.rate_limit.as_ref()
    }
}
