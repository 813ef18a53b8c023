//! Connection status values.
//!
//! # States
//! - Disconnected: no check has completed yet
//! - Checking: a probe is in flight
//! - Connected: the last probe succeeded
//! - Error: the last probe failed, or configuration is missing
//!
//! # State Transitions
//! ```text
//! Disconnected → Checking → Connected | Error
//! Connected | Error → Checking (when the cached report expires)
//! ```

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Checking,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Checking => "checking",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the most recent connection check.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionReport {
    pub status: ConnectionStatus,
    pub last_error: Option<String>,
    /// When the check finished; `None` until one has.
    pub checked_at: Option<Instant>,
}

impl ConnectionReport {
    pub(crate) fn initial() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            last_error: None,
            checked_at: None,
        }
    }

    pub(crate) fn checking(previous: &ConnectionReport) -> Self {
        Self {
            status: ConnectionStatus::Checking,
            last_error: None,
            checked_at: previous.checked_at,
        }
    }

    pub(crate) fn connected() -> Self {
        Self {
            status: ConnectionStatus::Connected,
            last_error: None,
            checked_at: Some(Instant::now()),
        }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self {
            status: ConnectionStatus::Error,
            last_error: Some(message.into()),
            checked_at: Some(Instant::now()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// Whether a completed check is younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.status != ConnectionStatus::Checking
            && self.checked_at.is_some_and(|at| at.elapsed() < ttl)
    }
}
