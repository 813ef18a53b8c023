//! Classified errors returned by every client call.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Category of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credentials rejected (401/403).
    Auth,
    /// No usable API key / base URL could be resolved.
    ConfigMissing,
    /// The attempt exceeded its deadline.
    Timeout,
    /// The service asked us to slow down (429).
    RateLimited,
    /// The service failed (5xx).
    Server,
    /// A 2xx body that does not decode into the caller's type.
    Decode,
    /// No response at all (connect, DNS, reset).
    Network,
    /// The request itself is wrong (404 and other 4xx).
    Validation,
    /// Rejected locally because the circuit breaker is open.
    CircuitOpen,
}

impl ErrorKind {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Auth => "auth",
            ErrorKind::ConfigMissing => "config_missing",
            ErrorKind::Timeout => "timeout",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Server => "server",
            ErrorKind::Decode => "decode",
            ErrorKind::Network => "network",
            ErrorKind::Validation => "validation",
            ErrorKind::CircuitOpen => "circuit_open",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Auth => "Auth error",
            ErrorKind::ConfigMissing => "Configuration missing",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::RateLimited => "Rate limited",
            ErrorKind::Server => "Server error",
            ErrorKind::Decode => "Unexpected response",
            ErrorKind::Network => "Network error",
            ErrorKind::Validation => "Invalid request",
            ErrorKind::CircuitOpen => "Circuit open",
        };
        f.write_str(label)
    }
}

/// A failure tagged with its category.
///
/// Whether the failure may be retried is decided once, when the error is
/// classified, and never recomputed.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    kind: ErrorKind,
    message: String,
    retryable: bool,
    status: Option<u16>,
    retry_after: Option<Duration>,
}

impl ClassifiedError {
    fn new(kind: ErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            status: None,
            retry_after: None,
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, message, false)
    }

    pub fn config_missing() -> Self {
        Self::new(ErrorKind::ConfigMissing, "configuration missing", false)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message, false)
    }

    /// A 429. Transient unless the server asks us to wait longer than `max_wait`.
    pub fn rate_limited(
        message: impl Into<String>,
        retry_after: Option<Duration>,
        max_wait: Duration,
    ) -> Self {
        let transient = retry_after.map_or(true, |wait| wait <= max_wait);
        let mut err = Self::new(ErrorKind::RateLimited, message, transient);
        err.retry_after = retry_after;
        err
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, message, true)
    }

    /// The service answered 2xx but the body could not be decoded.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message, false)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message, true)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message, false)
    }

    pub fn circuit_open() -> Self {
        Self::new(ErrorKind::CircuitOpen, "service temporarily unavailable", false)
    }

    pub(crate) fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// HTTP status that produced this error, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Server-requested wait before the next attempt (429 `Retry-After`).
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Whether this failure says something about the service's health.
    ///
    /// Validation and decode errors are caller bugs (the service did answer)
    /// and breaker rejections are our own decision, so none of them counts
    /// against the breaker.
    pub fn counts_as_service_failure(&self) -> bool {
        !matches!(
            self.kind,
            ErrorKind::Validation | ErrorKind::Decode | ErrorKind::CircuitOpen
        )
    }

    /// Short actionable sentence for end users.
    pub fn user_hint(&self) -> &'static str {
        match self.kind {
            ErrorKind::Auth => "Check your API key.",
            ErrorKind::ConfigMissing => {
                "Configure the API key and base URL for the automation service."
            }
            ErrorKind::Timeout => {
                "The automation service is responding slowly. Try again shortly."
            }
            ErrorKind::RateLimited => "Too many requests. Wait a moment before retrying.",
            ErrorKind::Server | ErrorKind::CircuitOpen => "Service temporarily unavailable.",
            ErrorKind::Decode => "The service returned data in an unexpected format.",
            ErrorKind::Network => {
                "Cannot reach the automation service. Check the base URL and network."
            }
            ErrorKind::Validation => "The request was rejected. Check the submitted data.",
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClassifiedError>;
