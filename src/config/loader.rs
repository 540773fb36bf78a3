//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

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

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: ServerConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build configuration from an optional file plus the process environment.
///
/// Without a file, defaults are used and the environment must supply the
/// credentials.
pub fn load(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let mut config = ServerConfig::default();
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Overlay environment variables onto `config`.
///
/// `lookup` is injected so tests don't have to mutate the process
/// environment.
pub fn apply_env_overrides<F>(config: &mut ServerConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("SERVER_ADDR") {
        config.listener.bind_address = v;
    }
    if let Some(v) = lookup("LOGIN_PW") {
        config.auth.login_password = v;
    }
    if let Some(v) = lookup("CALLER_ID") {
        config.auth.caller_id = v;
    }
    if let Some(v) = lookup("DATABASE_PATH") {
        config.store.path = PathBuf::from(v);
    }
    if let Some(v) = lookup("DEV_MODE") {
        config.server.dev_mode = v == "true";
    }
    if let Some(v) = lookup("ENABLE_DEBUG_SESSION_APIS") {
        config.debug.session_apis = v == "true";
    }
}
