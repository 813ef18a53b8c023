//! Client core for the remote automation service.
//!
//! # Data Flow
//! ```text
//! ResourceClient (resources.rs) / ConnectionTracker (health)
//!     → RequestExecutor (executor.rs)
//!         → CredentialProvider, CircuitBreaker, RetryPolicy
//!         → HttpTransport
//!     → value or ClassifiedError (error.rs)
//! ```
//!
//! # Design Decisions
//! - One [`AutomationClient`] owns one breaker and one credential cache;
//!   everything it hands out shares them through `Arc`
//! - Resolver and transport are injected, so call sites with different
//!   secret sources build different clients rather than sharing globals

pub mod error;
pub mod executor;
pub mod resources;

use std::sync::Arc;

pub use error::{ClassifiedError, ClientResult, ErrorKind};
pub use executor::{RequestAttempt, RequestExecutor};
pub use resources::{ListOptions, Page, ResourceClient, WORKFLOWS};

use crate::config::ClientConfig;
use crate::credentials::{CredentialProvider, SecretResolver};
use crate::health::ConnectionTracker;
use crate::resilience::{CircuitBreaker, RetryPolicy};
use crate::transport::{HttpTransport, ReqwestTransport, TransportError};

/// Fully wired client built from a [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct AutomationClient {
    executor: Arc<RequestExecutor>,
    tracker: Arc<ConnectionTracker>,
}

impl AutomationClient {
    /// Build a client that talks HTTP through `reqwest`.
    pub fn new(
        config: &ClientConfig,
        resolver: Arc<dyn SecretResolver>,
    ) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::from_config(&config.http)?;
        Ok(Self::with_transport(config, resolver, Arc::new(transport)))
    }

    /// Build a client over a caller-supplied transport.
    pub fn with_transport(
        config: &ClientConfig,
        resolver: Arc<dyn SecretResolver>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let credentials = CredentialProvider::new(resolver, config.credentials.cache_ttl());
        let credentials = Arc::new(credentials);
        let breaker = Arc::new(CircuitBreaker::from_config(&config.circuit_breaker));

        let executor = RequestExecutor::new(transport, credentials, breaker)
            .with_retry_policy(RetryPolicy::from_config(&config.retries))
            .with_timeout(config.http.request_timeout())
            .with_auth_header(config.http.auth_header.clone());
        let executor = Arc::new(executor);

        let tracker = Arc::new(ConnectionTracker::from_config(executor.clone(), &config.health));

        tracing::debug!(
            failure_threshold = config.circuit_breaker.failure_threshold,
            max_attempts = config.retries.max_attempts,
            timeout_secs = config.http.request_timeout_secs,
            "Automation client initialized"
        );

        Self { executor, tracker }
    }

    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    pub fn tracker(&self) -> &Arc<ConnectionTracker> {
        &self.tracker
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        self.executor.breaker()
    }

    /// Operations on an arbitrary collection path.
    pub fn resources(&self, collection: &str) -> ResourceClient {
        ResourceClient::new(self.executor.clone(), collection)
    }

    pub fn workflows(&self) -> ResourceClient {
        self.resources(WORKFLOWS)
    }
}
