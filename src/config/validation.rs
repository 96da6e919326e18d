//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (host non-empty, port >= 1000, limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before a server is allowed to acquire any resources

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// Lowest port a server may bind.
pub const MIN_PORT: u16 = 1000;

/// A single semantic violation in a [`ServerConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value for '{field}': {message}")]
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

/// Check every field of `config`, collecting all violations.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.host.trim().is_empty() {
        errors.push(ValidationError::new("host", "must not be empty"));
    }
    if config.port < MIN_PORT {
        errors.push(ValidationError::new(
            "port",
            format!("{} is below the minimum of {}", config.port, MIN_PORT),
        ));
    }
    if config.backlog == 0 {
        errors.push(ValidationError::new("backlog", "must be positive"));
    }
    if config.max_connections == 0 {
        errors.push(ValidationError::new("max_connections", "must be positive"));
    }
    if config.timeout_ms == 0 {
        errors.push(ValidationError::new("timeout_ms", "must be positive"));
    }
    if config.read_buffer_size == 0 {
        errors.push(ValidationError::new("read_buffer_size", "must be positive"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
