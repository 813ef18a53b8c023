//! Metrics collection.
//!
//! # Metrics
//! - `automation_requests_total` (counter): logical calls by endpoint, method, outcome
//! - `automation_request_duration_seconds` (histogram): per-attempt latency
//! - `automation_retries_total` (counter): retries by error kind
//! - `automation_circuit_open` (gauge): 1=open, 0.5=half-open, 0=closed
//! - `automation_connection_status` (gauge): 1=connected, 0=otherwise
//! - `automation_credential_resolutions_total` (counter): resolver calls by outcome
//!
//! Nothing is recorded unless the application installs a recorder.

use tokio::time::Instant;

use crate::client::error::ErrorKind;
use crate::health::ConnectionStatus;
use crate::resilience::CircuitState;

/// Record the final outcome of a logical call.
pub fn record_request(endpoint: &str, method: &str, outcome: &'static str) {
    ::metrics::counter!(
        "automation_requests_total",
        "endpoint" => metric_path(endpoint),
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record how long a single attempt took.
pub fn record_attempt_latency(method: &str, start: Instant) {
    ::metrics::histogram!(
        "automation_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_retry(kind: ErrorKind) {
    ::metrics::counter!("automation_retries_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_circuit_state(state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 0.5,
        CircuitState::Open => 1.0,
    };
    ::metrics::gauge!("automation_circuit_open").set(value);
}

pub fn record_connection_status(status: ConnectionStatus) {
    let value = if status == ConnectionStatus::Connected { 1.0 } else { 0.0 };
    ::metrics::gauge!("automation_connection_status").set(value);
}

pub fn record_credential_resolution(outcome: &'static str) {
    ::metrics::counter!("automation_credential_resolutions_total", "outcome" => outcome)
        .increment(1);
}

/// Reduce an endpoint to its route template so labels stay low-cardinality.
///
/// Paths alternate collection and item segments, so every second segment
/// is an ID and becomes `{id}`. The query string is dropped.
fn metric_path(endpoint: &str) -> String {
    let path = endpoint.split('?').next().unwrap_or(endpoint);
    let mut template = String::with_capacity(path.len());
    for (index, segment) in path.split('/').filter(|s| !s.is_empty()).enumerate() {
        template.push('/');
        template.push_str(if index % 2 == 1 { "{id}" } else { segment });
    }
    if template.is_empty() {
        template.push('/');
    }
    template
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_path() {
        assert_eq!(metric_path("/workflows?limit=1"), "/workflows");
        assert_eq!(metric_path("/workflows/42"), "/workflows/{id}");
        assert_eq!(metric_path("/workflows/42/activate"), "/workflows/{id}/activate");
        assert_eq!(metric_path("/workflows/7/deactivate"), "/workflows/{id}/deactivate");
        assert_eq!(metric_path("/"), "/");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("/workflows", "GET", "ok");
        record_retry(ErrorKind::Server);
        record_circuit_state(CircuitState::Open);
        record_connection_status(ConnectionStatus::Connected);
        record_credential_resolution("resolved");
    }
}
