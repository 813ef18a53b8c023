//! HTTP transport boundary.
//!
//! The executor speaks to the network only through [`HttpTransport`], so
//! tests and alternative stacks can substitute their own implementation.
//! [`ReqwestTransport`] is the production one.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

pub use reqwest::Method;

pub mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use self::http::ReqwestTransport;

/// A fully-built outgoing request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    /// Serialized JSON body, if any.
    pub body: Option<Vec<u8>>,
}

/// A response as received from the wire.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `Retry-After` expressed in seconds, if present.
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

/// Failures where no HTTP response was obtained.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not establish a connection (DNS, refused, TLS).
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request could not be built (bad header name or value) and
    /// never left the process.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The transport's own deadline expired.
    #[error("transport timed out")]
    Timeout,

    /// Anything else that happened before a response arrived.
    #[error("transport error: {0}")]
    Other(String),
}

/// Send a request, get a response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_helpers() {
        let resp = TransportResponse::new(429, "").with_header("Retry-After", "12");
        assert!(!resp.is_success());
        assert_eq!(resp.header("retry-after"), Some("12"));
        assert_eq!(resp.retry_after(), Some(Duration::from_secs(12)));

        let resp = TransportResponse::new(204, "");
        assert!(resp.is_success());
        assert_eq!(resp.retry_after(), None);
    }

    #[test]
    fn test_http_date_retry_after_is_ignored() {
        let resp = TransportResponse::new(429, "")
            .with_header("retry-after", "Wed, 21 Oct 2026 07:28:00 GMT");
        assert_eq!(resp.retry_after(), None);
    }
}
