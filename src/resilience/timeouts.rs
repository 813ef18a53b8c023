//! Timeout enforcement.
//!
//! Every attempt against the remote service runs under its own deadline.
//! A deadline miss becomes a `Timeout` classification, distinct from
//! network failures, and drops the in-flight future.

use std::future::Future;
use std::time::Duration;

use crate::client::error::ClassifiedError;

/// Run `fut` with a deadline, classifying expiry as a timeout.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, ClassifiedError>
where
    F: Future<Output = Result<T, ClassifiedError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(ClassifiedError::timeout(format!(
            "no response within {} ms",
            deadline.as_millis()
        ))),
    }
}
