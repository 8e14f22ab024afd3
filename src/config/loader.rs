//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },

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

/// Load configuration: file (if given), then environment overrides, then
/// validation.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse TOML text into a config without validating it.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Apply the supported environment variables on top of `config`.
///
/// `lookup` returns the variable's value, if set.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("REDIS_HOST") {
        config.store.host = host;
    }
    if let Some(port) = lookup("REDIS_PORT") {
        config.store.port = parse_env("REDIS_PORT", port)?;
    }
    if let Some(username) = lookup("REDIS_USERNAME") {
        config.store.username = Some(username);
    }
    if let Some(password) = lookup("REDIS_PASSWORD") {
        config.store.password = Some(password);
    }
    if let Some(db) = lookup("REDIS_DB") {
        config.store.database = parse_env("REDIS_DB", db)?;
    }
    if let Some(timeout) = lookup("REQUEST_TIMEOUT_MS") {
        config.cache.timeout_ms = parse_env("REQUEST_TIMEOUT_MS", timeout)?;
    }
    if let Some(key) = lookup("ADMIN_API_KEY") {
        config.admin.api_key = key;
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{LogFormat, StoreBackend};
    use std::collections::HashMap;

    #[test]
    fn test_parse_partial_file() {
        let config = parse_config(
            r#"
            [cache]
            timeout_ms = 150

            [store]
            backend = "memory"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.timeout_ms, 150);
        assert_eq!(config.cache.failure_threshold, 3);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[cache]\ntimeout_ms = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("REDIS_HOST", "redis.example"),
            ("REDIS_PORT", "13225"),
            ("REDIS_USERNAME", "default"),
            ("REDIS_PASSWORD", "secret"),
            ("REQUEST_TIMEOUT_MS", "250"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string())).unwrap();

        assert_eq!(config.store.host, "redis.example");
        assert_eq!(config.store.port, 13225);
        assert_eq!(config.store.username.as_deref(), Some("default"));
        assert_eq!(config.store.password.as_deref(), Some("secret"));
        assert_eq!(config.cache.timeout_ms, 250);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = AppConfig::default();
        let err = apply_env_overrides(&mut config, |name| {
            (name == "REDIS_PORT").then(|| "not-a-port".to_string())
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for REDIS_PORT: 'not-a-port'");
    }
}
