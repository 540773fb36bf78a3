//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (durations > 0, addresses parse)
//! - Check relationships between settings (debounce shorter than session)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.auth.login_password.is_empty() {
        errors.push(ValidationError::new("auth.login_password", "must be set (LOGIN_PW)"));
    }
    if config.auth.caller_id.is_empty() {
        errors.push(ValidationError::new("auth.caller_id", "must be set (CALLER_ID)"));
    }
    if config.auth.cookie_name.is_empty() {
        errors.push(ValidationError::new("auth.cookie_name", "must not be empty"));
    }
    if !config.auth.login_path.starts_with('/') {
        errors.push(ValidationError::new("auth.login_path", "must be an absolute path"));
    }

    let session = &config.session;
    if session.duration_secs == 0 {
        errors.push(ValidationError::new("session.duration_secs", "must be > 0"));
    }
    if session.flush_interval_secs == 0 {
        errors.push(ValidationError::new("session.flush_interval_secs", "must be > 0"));
    }
    if session.debounce_secs >= session.duration_secs && session.duration_secs > 0 {
        errors.push(ValidationError::new(
            "session.debounce_secs",
            "must be shorter than session.duration_secs",
        ));
    }

    if config.cache.ttl_secs == 0 || config.cache.dev_ttl_secs == 0 {
        errors.push(ValidationError::new("cache", "ttl_secs and dev_ttl_secs must be > 0"));
    }

    if config.store.timeout_secs == 0 {
        errors.push(ValidationError::new("store.timeout_secs", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if !config.server.root_path.starts_with('/') {
        errors.push(ValidationError::new("server.root_path", "must be an absolute path"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.auth.login_password = "hunter2".into();
        config.auth.caller_id = "me".into();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_defaults_require_credentials() {
        let errors = validate_config(&ServerConfig::default()).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"auth.login_password"));
        assert!(fields.contains(&"auth.caller_id"));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.listener.bind_address = "nowhere".into();
        config.session.flush_interval_secs = 0;
        config.store.timeout_secs = 0;
        config.server.root_path = "sprintboard".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_debounce_must_be_shorter_than_session() {
        let mut config = valid();
        config.session.duration_secs = 10;
        config.session.debounce_secs = 10;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "session.debounce_secs");
    }

    #[test]
    fn test_metrics_address_ignored_when_disabled() {
        let mut config = valid();
        config.observability.metrics_enabled = false;
        config.observability.metrics_address = "bogus".into();
        assert!(validate_config(&config).is_ok());
    }
}
