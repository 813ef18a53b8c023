//! Request executor: every call to the remote service passes through here.
//!
//! # Data Flow
//! ```text
//! request(endpoint, method, body)
//!     → circuit breaker (reject while open)
//!     → credential provider (ConfigMissing if absent)
//!     → retry policy
//!         → attempt: build URL, inject auth header, send under deadline
//!         → classify status / transport failure
//!     → circuit breaker (record final outcome)
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::client::error::{ClassifiedError, ClientResult, ErrorKind};
use crate::credentials::{CredentialProvider, Credentials};
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;
use crate::resilience::{CircuitBreaker, RetryPolicy};
use crate::transport::{HttpTransport, Method, TransportError, TransportRequest, TransportResponse};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_AUTH_HEADER: &str = "X-API-KEY";
const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// One attempt of a logical call. Lives only as long as the attempt.
#[derive(Debug, Clone)]
pub struct RequestAttempt {
    pub endpoint: String,
    pub method: Method,
    pub attempt_number: u32,
    pub started_at: Instant,
}

impl RequestAttempt {
    fn start(endpoint: &str, method: &Method, attempt_number: u32) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            method: method.clone(),
            attempt_number,
            started_at: Instant::now(),
        }
    }
}

/// Issues calls against the remote service with breaker, retry and timeout.
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<CredentialProvider>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    timeout: Duration,
    auth_header: String,
}

impl RequestExecutor {
    /// Create an executor with default retry policy, 15s timeout and `X-API-KEY` auth.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<CredentialProvider>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            transport,
            credentials,
            breaker,
            retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Per-attempt deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = header.into();
        self
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn credentials(&self) -> &Arc<CredentialProvider> {
        &self.credentials
    }

    /// Perform one logical call and decode the JSON response into `T`.
    ///
    /// `endpoint` is a path (with optional query) relative to the base URL.
    /// Retries happen inside; only the final outcome is returned and only
    /// the final outcome is reported to the circuit breaker.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        headers: &[(&str, &str)],
    ) -> ClientResult<T> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "automation_request",
            request_id = %request_id,
            method = %method,
            endpoint,
        );

        self.execute(endpoint, method, body, headers, &self.retry, request_id)
            .instrument(span)
            .await
    }

    /// Like [`request`](Self::request) but makes a single attempt.
    ///
    /// Used for connection checks, where a quick verdict matters more than persistence.
    pub async fn request_once<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        headers: &[(&str, &str)],
    ) -> ClientResult<T> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "automation_request",
            request_id = %request_id,
            method = %method,
            endpoint,
        );

        let policy = RetryPolicy::none();
        self.execute(endpoint, method, body, headers, &policy, request_id)
            .instrument(span)
            .await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        headers: &[(&str, &str)],
        retry: &RetryPolicy,
        request_id: Uuid,
    ) -> ClientResult<T> {
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| {
                ClassifiedError::validation(format!("request body is not valid JSON: {e}"))
            })?;

        if !self.breaker.allow_request() {
            tracing::warn!("Circuit open, rejecting request");
            metrics::record_request(endpoint, method.as_str(), ErrorKind::CircuitOpen.as_str());
            return Err(ClassifiedError::circuit_open());
        }

        let result = match self.credentials.resolve().await {
            None => Err(ClassifiedError::config_missing()),
            Some(credentials) => {
                retry
                    .execute(|attempt_number| {
                        let attempt = RequestAttempt::start(endpoint, &method, attempt_number);
                        self.attempt(&credentials, attempt, body.clone(), headers, request_id)
                    })
                    .await
            }
        };

        match &result {
            Ok(_) => {
                self.breaker.record_success();
                tracing::debug!("Request succeeded");
                metrics::record_request(endpoint, method.as_str(), "ok");
            }
            Err(err) => {
                if err.counts_as_service_failure() {
                    self.breaker.record_failure();
                } else {
                    self.breaker.record_neutral();
                }
                if err.kind() == ErrorKind::Auth {
                    // Keys may have been rotated; do not wait out the cache window.
                    self.credentials.invalidate().await;
                }
                tracing::warn!(kind = err.kind().as_str(), error = %err, "Request failed");
                metrics::record_request(endpoint, method.as_str(), err.kind().as_str());
            }
        }

        result
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        credentials: &Credentials,
        attempt: RequestAttempt,
        body: Option<Vec<u8>>,
        extra_headers: &[(&str, &str)],
        request_id: Uuid,
    ) -> ClientResult<T> {
        let url = credentials.endpoint_url(&attempt.endpoint).map_err(|e| {
            ClassifiedError::validation(format!("invalid endpoint '{}': {}", attempt.endpoint, e))
        })?;

        let mut headers = vec![
            (self.auth_header.clone(), credentials.api_key().to_string()),
            (REQUEST_ID_HEADER.to_string(), request_id.to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        headers.extend(extra_headers.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        let request = TransportRequest {
            method: attempt.method.clone(),
            url,
            headers,
            body,
        };

        tracing::debug!(attempt = attempt.attempt_number, "Sending request");

        let timeout = self.timeout;
        let response = with_deadline(timeout, async {
            self.transport
                .send(request)
                .await
                .map_err(|e| classify_transport_error(e, timeout))
        })
        .await;

        metrics::record_attempt_latency(attempt.method.as_str(), attempt.started_at);

        let response = response?;
        tracing::debug!(
            attempt = attempt.attempt_number,
            status = response.status,
            elapsed_ms = attempt.started_at.elapsed().as_millis() as u64,
            "Response received"
        );

        classify_response(response, self.retry.max_delay())
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .field("auth_header", &self.auth_header)
            .finish()
    }
}

fn classify_transport_error(err: TransportError, timeout: Duration) -> ClassifiedError {
    match err {
        TransportError::Timeout => {
            ClassifiedError::timeout(format!("no response within {} ms", timeout.as_millis()))
        }
        TransportError::InvalidRequest(detail) => {
            ClassifiedError::validation(format!("request could not be built: {detail}"))
        }
        other => ClassifiedError::network(other.to_string()),
    }
}

/// Turn a received response into a decoded value or a classified error.
pub(crate) fn classify_response<T: DeserializeOwned>(
    response: TransportResponse,
    max_wait: Duration,
) -> ClientResult<T> {
    let status = response.status;

    if response.is_success() {
        let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &response.body
        };
        return serde_json::from_slice(body).map_err(|e| {
            ClassifiedError::decode(format!("unexpected response body: {e}")).with_status(status)
        });
    }

    let message = error_message(&response);
    let err = match status {
        401 | 403 => ClassifiedError::auth(message),
        404 => ClassifiedError::validation(message),
        408 => ClassifiedError::timeout(message),
        429 => ClassifiedError::rate_limited(message, response.retry_after(), max_wait),
        500..=599 => ClassifiedError::server(message),
        _ => ClassifiedError::validation(message),
    };
    Err(err.with_status(status))
}

/// Prefer the service's own `message` field, then a short text body, then the reason phrase.
fn error_message(response: &TransportResponse) -> String {
    let detail = serde_json::from_slice::<Value>(&response.body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .or_else(|| {
            let text = String::from_utf8_lossy(&response.body).trim().to_string();
            (!text.is_empty() && text.len() <= 200 && !text.starts_with('<')).then_some(text)
        })
        .or_else(|| {
            reqwest::StatusCode::from_u16(response.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unexpected status".to_string());

    format!("HTTP {}: {}", response.status, detail)
}
