//! Connection state tracking.
//!
//! # Responsibilities
//! - Probe the remote service on demand
//! - Keep the last report for a short window
//! - Surface missing configuration without touching the network

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use crate::client::executor::RequestExecutor;
use crate::config::HealthConfig;
use crate::health::state::{ConnectionReport, ConnectionStatus};
use crate::observability::metrics;
use crate::transport::Method;

const CONFIG_MISSING: &str = "configuration missing";

pub struct ConnectionTracker {
    executor: Arc<RequestExecutor>,
    report: Mutex<ConnectionReport>,
    probe: tokio::sync::Mutex<()>,
    ttl: Duration,
    probe_path: String,
}

impl ConnectionTracker {
    pub fn new(
        executor: Arc<RequestExecutor>,
        ttl: Duration,
        probe_path: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            report: Mutex::new(ConnectionReport::initial()),
            probe: tokio::sync::Mutex::new(()),
            ttl,
            probe_path: probe_path.into(),
        }
    }

    pub fn from_config(executor: Arc<RequestExecutor>, config: &HealthConfig) -> Self {
        Self::new(executor, config.cache_ttl(), config.probe_path.clone())
    }

    /// Last known report. Never performs I/O.
    pub fn current(&self) -> ConnectionReport {
        self.lock().clone()
    }

    /// The cached report while it is fresh, otherwise a new check.
    pub async fn cached_status(&self) -> ConnectionReport {
        let report = self.current();
        if report.is_fresh(self.ttl) {
            return report;
        }

        let _probe = self.probe.lock().await;
        // Another caller may have refreshed the report while we waited.
        let report = self.current();
        if report.is_fresh(self.ttl) {
            return report;
        }
        self.run_check().await
    }

    /// Probe the service now and cache the result.
    ///
    /// A caller arriving while a probe is in flight receives that probe's
    /// result instead of issuing another.
    pub async fn check_connection(&self) -> ConnectionReport {
        let requested_at = Instant::now();
        let _probe = self.probe.lock().await;

        let report = self.current();
        if report.status != ConnectionStatus::Checking
            && report.checked_at.is_some_and(|at| at > requested_at)
        {
            return report;
        }
        self.run_check().await
    }

    /// Callers must hold the probe lock.
    async fn run_check(&self) -> ConnectionReport {
        {
            let mut report = self.lock();
            *report = ConnectionReport::checking(&report);
        }
        metrics::record_connection_status(ConnectionStatus::Checking);

        let report = if self.executor.credentials().resolve().await.is_none() {
            tracing::warn!("Connection check skipped, {}", CONFIG_MISSING);
            ConnectionReport::error(CONFIG_MISSING)
        } else {
            match self
                .executor
                .request_once::<Value>(&self.probe_path, Method::GET, None, &[])
                .await
            {
                Ok(_) => {
                    tracing::info!(probe = %self.probe_path, "Automation service reachable");
                    ConnectionReport::connected()
                }
                Err(err) => {
                    tracing::warn!(
                        probe = %self.probe_path,
                        kind = err.kind().as_str(),
                        error = %err,
                        "Connection check failed"
                    );
                    ConnectionReport::error(err.to_string())
                }
            }
        };

        metrics::record_connection_status(report.status);
        *self.lock() = report.clone();
        report
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionReport> {
        self.report.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ConnectionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionTracker")
            .field("report", &self.current())
            .field("ttl", &self.ttl)
            .field("probe_path", &self.probe_path)
            .finish()
    }
}
