//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the acceptor.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the acceptor server.
///
/// Immutable once handed to [`Server::new`](crate::Server::new).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Host or IP to bind (must be non-empty).
    pub host: String,

    /// Port to bind (must be >= 1000).
    pub port: u16,

    /// Listen backlog passed to `listen(2)`.
    pub backlog: u32,

    /// Concurrency ceiling: maximum simultaneously open connections.
    pub max_connections: usize,

    /// Per-operation timeout in milliseconds (accept and read).
    pub timeout_ms: u64,

    /// Maximum number of bytes a single transfer returns.
    pub read_buffer_size: usize,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3339,
            backlog: 5,
            max_connections: 100,
            timeout_ms: 1000,
            read_buffer_size: 4096,
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ServerConfig {
    /// `host:port` form suitable for address resolution.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Per-operation timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
