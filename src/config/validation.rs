//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows, bursts, timeouts > 0)
//! - Detect duplicate route prefixes
//! - Check that targets and path filters parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{FixedWindowConfig, GatewayConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("route prefix '{0}' must start with '/'")]
    PrefixNotAbsolute(String),

    #[error("route prefix '{0}' must not end with '/'")]
    PrefixTrailingSlash(String),

    #[error("duplicate route prefix '{0}'")]
    DuplicatePrefix(String),

    #[error("route '{prefix}' has invalid target '{target}': {reason}")]
    InvalidTarget {
        prefix: String,
        target: String,
        reason: String,
    },

    #[error("route '{prefix}' has invalid path filter: {reason}")]
    InvalidPathFilter { prefix: String, reason: String },

    #[error("route '{prefix}' has an empty rewrite pattern")]
    EmptyRewritePattern { prefix: String },

    #[error("{0} must be greater than zero")]
    NotPositive(String),
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::NotPositive("timeouts.upstream_secs".into()));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::NotPositive("security.max_body_size".into()));
    }

    check_fixed_window(&config.rate_limit.fixed_window, "rate_limit.fixed_window", &mut errors);

    let bucket = &config.rate_limit.token_bucket;
    if bucket.rate == 0 {
        errors.push(ValidationError::NotPositive("rate_limit.token_bucket.rate".into()));
    }
    if bucket.burst == 0 {
        errors.push(ValidationError::NotPositive("rate_limit.token_bucket.burst".into()));
    }
    if bucket.interval_secs == 0 {
        errors.push(ValidationError::NotPositive("rate_limit.token_bucket.interval_secs".into()));
    }

    let mut seen = HashSet::new();
    for route in &config.routes {
        let prefix = route.prefix.as_str();

        if !prefix.starts_with('/') {
            errors.push(ValidationError::PrefixNotAbsolute(prefix.to_string()));
        } else if prefix.len() > 1 && prefix.ends_with('/') {
            errors.push(ValidationError::PrefixTrailingSlash(prefix.to_string()));
        }

        if !seen.insert(prefix) {
            errors.push(ValidationError::DuplicatePrefix(prefix.to_string()));
        }

        if let Err(reason) = check_target(&route.target) {
            errors.push(ValidationError::InvalidTarget {
                prefix: prefix.to_string(),
                target: route.target.clone(),
                reason,
            });
        }

        if let Some(pattern) = &route.path_filter {
            if let Err(e) = regex::Regex::new(pattern) {
                errors.push(ValidationError::InvalidPathFilter {
                    prefix: prefix.to_string(),
                    reason: e.to_string(),
                });
            }
        }

        if route.path_rewrite.iter().any(|rule| rule.from.is_empty()) {
            errors.push(ValidationError::EmptyRewritePattern {
                prefix: prefix.to_string(),
            });
        }

        if let Some(limit) = &route.rate_limit {
            check_fixed_window(limit, &format!("routes[{}].rate_limit", prefix), &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_fixed_window(limit: &FixedWindowConfig, field: &str, errors: &mut Vec<ValidationError>) {
    if limit.max_requests == 0 {
        errors.push(ValidationError::NotPositive(format!("{}.max_requests", field)));
    }
    if limit.window_secs == 0 {
        errors.push(ValidationError::NotPositive(format!("{}.window_secs", field)));
    }
}

fn check_target(target: &str) -> Result<(), String> {
    let url = Url::parse(target).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() {
        return Err("target must not carry a query string".to_string());
    }
    Ok(())
}
