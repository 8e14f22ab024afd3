//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds >= 1)
//! - Validate addresses parse before anything binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{AppConfig, StoreBackend, PLACEHOLDER_API_KEY};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} is not a valid socket address: '{value}'")]
    BadAddress { field: &'static str, value: String },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("admin.api_key must be changed from the placeholder when admin is enabled")]
    PlaceholderApiKey,
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "listener.request_timeout_secs" });
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero { field: "listener.max_body_bytes" });
    }

    if config.cache.timeout_ms == 0 {
        errors.push(ValidationError::Zero { field: "cache.timeout_ms" });
    }
    if config.cache.failure_threshold == 0 {
        errors.push(ValidationError::Zero { field: "cache.failure_threshold" });
    }
    if config.cache.cooldown_ms == 0 {
        errors.push(ValidationError::Zero { field: "cache.cooldown_ms" });
    }

    if config.store.backend == StoreBackend::Redis {
        if config.store.host.trim().is_empty() {
            errors.push(ValidationError::Empty { field: "store.host" });
        }
        if config.store.port == 0 {
            errors.push(ValidationError::Zero { field: "store.port" });
        }
        if config.store.connect_timeout_secs == 0 {
            errors.push(ValidationError::Zero { field: "store.connect_timeout_secs" });
        }
    }

    if config.catalog.max_page_size == 0 {
        errors.push(ValidationError::Zero { field: "catalog.max_page_size" });
    }

    if config.observability.metrics_enabled {
        check_addr(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    if config.admin.enabled {
        check_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::Empty { field: "admin.api_key" });
        } else if config.admin.api_key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::PlaceholderApiKey);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.cache.timeout_ms = 0;
        config.cache.failure_threshold = 0;
        config.listener.bind_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::Zero { field: "cache.timeout_ms" }));
        assert!(errors.contains(&ValidationError::Zero { field: "cache.failure_threshold" }));
    }

    #[test]
    fn test_admin_requires_real_key() {
        let mut config = AppConfig::default();
        config.admin.enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::PlaceholderApiKey])
        );

        config.admin.api_key = "s3cret".into();
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_memory_backend_ignores_store_address() {
        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::Memory;
        config.store.host = String::new();
        assert_eq!(validate_config(&config), Ok(()));
    }
}
