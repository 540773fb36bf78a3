//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the tracker server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Login and cookie settings.
    pub auth: AuthConfig,

    /// Session lifetime and persistence cadence.
    pub session: SessionConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Durable store selection.
    pub store: StoreConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Debug surface.
    pub debug: DebugConfig,

    /// Static assets and runtime mode.
    pub server: RuntimeConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared login password.
    pub login_password: String,

    /// The single caller identity all sessions belong to.
    pub caller_id: String,

    /// Name of the session cookie.
    pub cookie_name: String,

    /// Where unauthenticated page requests are sent.
    pub login_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_password: String::new(),
            caller_id: String::new(),
            cookie_name: "session".to_string(),
            login_path: "/login".to_string(),
        }
    }
}

/// Session registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Fixed validity window measured from creation, in seconds.
    pub duration_secs: u64,

    /// Minimum gap between two persisted access times, in seconds.
    pub debounce_secs: u64,

    /// Interval of the background flush, in seconds.
    pub flush_interval_secs: u64,
}

impl SessionConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: 2 * 60 * 60,
            debounce_secs: 10,
            flush_interval_secs: 30,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,

    /// Entry lifetime used when dev mode is on.
    pub dev_ttl_secs: u64,
}

impl CacheConfig {
    /// TTL in effect for the given mode.
    pub fn effective_ttl(&self, dev_mode: bool) -> Duration {
        if dev_mode {
            Duration::from_secs(self.dev_ttl_secs)
        } else {
            Duration::from_secs(self.ttl_secs)
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 2,
            dev_ttl_secs: 5 * 60,
        }
    }
}

/// Durable store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

/// Durable store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Database file for the SQLite backend.
    pub path: PathBuf,

    /// Deadline for every store operation, in seconds.
    pub timeout_secs: u64,
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: PathBuf::from("tracker.db"),
            timeout_secs: 5,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty for terminals, JSON for log shipping.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Debug surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    /// Expose session/cache debug routes.
    pub session_apis: bool,

    /// Bearer key for the debug routes. Empty disables the check.
    pub api_key: String,
}

/// Static assets and runtime mode.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Development mode (longer cache TTL).
    pub dev_mode: bool,

    /// Directory of built front-end assets.
    pub static_dir: PathBuf,

    /// Where `/` redirects to.
    pub root_path: String,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            dev_mode: false,
            static_dir: PathBuf::from("dist"),
            root_path: "/sprintboard".to_string(),
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}
