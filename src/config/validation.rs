//! Configuration validation.
//!
//! Serde handles the syntactic side; this module checks value ranges and
//! returns every problem found rather than stopping at the first.

use std::fmt;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `retries.max_attempts`.
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

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.http.request_timeout_secs == 0 {
        errors.push(ValidationError::new("http.request_timeout_secs", "must be greater than 0"));
    }
    if config.http.auth_header.trim().is_empty() {
        errors.push(ValidationError::new("http.auth_header", "must not be empty"));
    } else if reqwest::header::HeaderName::from_bytes(config.http.auth_header.as_bytes()).is_err() {
        errors.push(ValidationError::new(
            "http.auth_header",
            format!("'{}' is not a valid header name", config.http.auth_header),
        ));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.max_delay_ms < config.retries.base_delay_ms {
        errors.push(ValidationError::new(
            "retries.max_delay_ms",
            "must not be smaller than retries.base_delay_ms",
        ));
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.failure_threshold",
            "must be at least 1",
        ));
    }
    if config.circuit_breaker.cooldown_secs == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.cooldown_secs",
            "must be greater than 0",
        ));
    }

    if config.credentials.api_key_env.is_empty() || config.credentials.base_url_env.is_empty() {
        errors.push(ValidationError::new(
            "credentials",
            "environment variable names must not be empty",
        ));
    }

    if !config.health.probe_path.starts_with('/') {
        errors.push(ValidationError::new("health.probe_path", "must start with '/'"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
