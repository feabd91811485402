//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, DEFAULT_PRIVATE_API_URL, DEFAULT_PUBLIC_API_URL};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: '{value}'")]
    Env { key: String, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: defaults, then the optional TOML file, then the
/// process environment. The result is validated before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply the gateway's environment variables on top of `config`.
///
/// `PUBLIC_API_URL` / `PRIVATE_API_URL` replace the stock upstream base in
/// any route target derived from it, so doc routes that append a suffix to
/// the base follow along.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(port) = get("PORT") {
        let port: u16 = parse_env("PORT", &port)?;
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{}:{}", host, port);
    }

    if let Some(url) = get("PUBLIC_API_URL") {
        rebase_targets(config, DEFAULT_PUBLIC_API_URL, &url);
    }
    if let Some(url) = get("PRIVATE_API_URL") {
        rebase_targets(config, DEFAULT_PRIVATE_API_URL, &url);
    }

    if let Some(environment) = get("ENVIRONMENT") {
        config.environment = environment;
    }
    if let Some(level) = get("LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(max) = get("RATE_LIMIT_MAX") {
        config.rate_limit.fixed_window.max_requests = parse_env("RATE_LIMIT_MAX", &max)?;
    }
    if let Some(window) = get("RATE_LIMIT_WINDOW") {
        config.rate_limit.fixed_window.window_secs = parse_env("RATE_LIMIT_WINDOW", &window)?;
    }
    if let Some(lan) = get("RATE_LIMIT_LAN_MODE") {
        config.rate_limit.lan_mode = parse_env("RATE_LIMIT_LAN_MODE", &lan)?;
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn rebase_targets(config: &mut GatewayConfig, default_base: &str, new_base: &str) {
    let new_base = new_base.trim_end_matches('/');
    for route in &mut config.routes {
        if let Some(rest) = route.target.strip_prefix(default_base) {
            route.target = format!("{}{}", new_base, rest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();
        config
            .routes
            .push(RouteConfig::new("/public/api-docs", "http://localhost:5050/api-docs"));

        apply_env_overrides(
            &mut config,
            env(&[
                ("PORT", "8088"),
                ("PUBLIC_API_URL", "http://public:9000/"),
                ("RATE_LIMIT_MAX", "7"),
                ("RATE_LIMIT_WINDOW", "15"),
                ("ENVIRONMENT", "production"),
                ("RATE_LIMIT_LAN_MODE", "true"),
            ]),
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:8088");
        assert_eq!(config.environment, "production");
        assert_eq!(config.rate_limit.fixed_window.max_requests, 7);
        assert_eq!(config.rate_limit.fixed_window.window_secs, 15);
        assert!(config.rate_limit.lan_mode);

        let targets: Vec<&str> = config.routes.iter().map(|r| r.target.as_str()).collect();
        assert!(targets.contains(&"http://public:9000"));
        assert!(targets.contains(&"http://public:9000/api-docs"));
        assert!(targets.contains(&"http://localhost:5555"));
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(&mut config, env(&[("PORT", "")])).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:5000");
    }

    #[test]
    fn test_bad_env_value_is_an_error() {
        let mut config = GatewayConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("RATE_LIMIT_MAX", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { ref key, .. } if key == "RATE_LIMIT_MAX"));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("gateway-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[listener]\nbind_address = \"127.0.0.1:7000\"\n\n[[routes]]\nprefix = \"/svc\"\ntarget = \"http://svc:1\"\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].prefix, "/svc");

        std::fs::remove_file(&path).unwrap_or_default();
    }
}
