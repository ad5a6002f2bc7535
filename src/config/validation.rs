//! Configuration validation.
//!
//! Serde handles the syntax; this module checks the values make sense
//! together. Every problem is reported, not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AdminConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
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

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AdminConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.timeouts.command_secs == 0 {
        errors.push(ValidationError::new("timeouts.command_secs", "must be greater than 0"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.nginx.binary.as_os_str().is_empty() {
        errors.push(ValidationError::new("nginx.binary", "must not be empty"));
    }

    if config.nginx.process_name.trim().is_empty() {
        errors.push(ValidationError::new("nginx.process_name", "must not be empty"));
    }

    if config.nginx.backups_dir == config.nginx.servers_dir {
        errors.push(ValidationError::new(
            "nginx.backups_dir",
            "must differ from nginx.servers_dir",
        ));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if matches!(config.auth.api_key.as_deref(), Some(key) if key.trim().is_empty()) {
        errors.push(ValidationError::new("auth.api_key", "must not be blank when set"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
