//! Circuit breaker guarding the remote service.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: service assumed down, requests fail fast
//! - Half-Open (opt-in): one trial request decides between Closed and Open
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= threshold
//! Open → Closed: cooldown elapsed (default mode, counter reset to 0)
//! Open → Half-Open: cooldown elapsed (half-open mode)
//! Half-Open → Closed: trial request succeeds
//! Half-Open → Open: trial request fails
//! any → Closed: any success
//! ```
//!
//! # Design Decisions
//! - One breaker per service, shared by every call through `Arc`
//! - Cooldown is an `open_until` instant evaluated lazily; no timer task
//! - All state sits behind a single mutex so concurrent updates are never lost

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed,
    Open { until: Instant },
    /// `trial` is when the in-flight trial was admitted.
    HalfOpen { trial: Option<Instant> },
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
    failure_count: u32,
}

/// Consecutive-failure circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    threshold: u32,
    cooldown: Duration,
    half_open: bool,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                phase: Phase::Closed,
                failure_count: 0,
            }),
            threshold: threshold.max(1),
            cooldown,
            half_open: false,
        }
    }

    /// Admit a single trial request after cooldown instead of closing outright.
    pub fn with_half_open(mut self, enabled: bool) -> Self {
        self.half_open = enabled;
        self
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(config.failure_threshold, config.cooldown()).with_half_open(config.half_open)
    }

    /// Whether a request may be issued right now.
    ///
    /// In half-open mode a trial that never reports back (its caller gave up)
    /// stops blocking others after one cooldown.
    pub fn allow_request(&self) -> bool {
        let now = Instant::now();
        let mut inner = self.lock();
        self.refresh(&mut inner, now);

        match inner.phase {
            Phase::Closed => true,
            Phase::Open { .. } => false,
            Phase::HalfOpen { trial: Some(started) }
                if now.duration_since(started) < self.cooldown =>
            {
                false
            }
            Phase::HalfOpen { .. } => {
                inner.phase = Phase::HalfOpen { trial: Some(now) };
                tracing::info!("Circuit half-open, admitting trial request");
                true
            }
        }
    }

    /// Report a successful call. Closes the breaker immediately.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        let was_closed = matches!(inner.phase, Phase::Closed);

        inner.failure_count = 0;
        inner.phase = Phase::Closed;

        if !was_closed {
            tracing::info!("Circuit closed after successful request");
            metrics::record_circuit_state(CircuitState::Closed);
        }
    }

    /// Report a failed call.
    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.lock();
        self.refresh(&mut inner, now);

        inner.failure_count = inner.failure_count.saturating_add(1);

        match inner.phase {
            Phase::Closed if inner.failure_count >= self.threshold => {
                inner.phase = Phase::Open {
                    until: now + self.cooldown,
                };
                tracing::warn!(
                    failures = inner.failure_count,
                    cooldown_secs = self.cooldown.as_secs(),
                    "Circuit opened"
                );
                metrics::record_circuit_state(CircuitState::Open);
            }
            Phase::HalfOpen { .. } => {
                inner.phase = Phase::Open {
                    until: now + self.cooldown,
                };
                tracing::warn!(
                    cooldown_secs = self.cooldown.as_secs(),
                    "Trial request failed, circuit reopened"
                );
                metrics::record_circuit_state(CircuitState::Open);
            }
            Phase::Closed | Phase::Open { .. } => {
                tracing::debug!(
                    failures = inner.failure_count,
                    threshold = self.threshold,
                    "Failure recorded"
                );
            }
        }
    }

    /// Report a call whose outcome says nothing about service health.
    ///
    /// Leaves the counter alone but frees a half-open trial slot so the
    /// next request can probe the service instead.
    pub fn record_neutral(&self) {
        let mut inner = self.lock();
        if let Phase::HalfOpen { trial: Some(_) } = inner.phase {
            inner.phase = Phase::HalfOpen { trial: None };
        }
    }

    /// Current state, after applying any elapsed cooldown.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.refresh(&mut inner, Instant::now());
        match inner.phase {
            Phase::Closed => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Consecutive failures observed since the last reset.
    pub fn failure_count(&self) -> u32 {
        let mut inner = self.lock();
        self.refresh(&mut inner, Instant::now());
        inner.failure_count
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    fn refresh(&self, inner: &mut Inner, now: Instant) {
        if let Phase::Open { until } = inner.phase {
            if now >= until {
                inner.failure_count = 0;
                if self.half_open {
                    inner.phase = Phase::HalfOpen { trial: None };
                    metrics::record_circuit_state(CircuitState::HalfOpen);
                } else {
                    inner.phase = Phase::Closed;
                    tracing::info!("Circuit cooldown elapsed, closing");
                    metrics::record_circuit_state(CircuitState::Closed);
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The state is plain data, so a panic elsewhere cannot leave it torn.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::from_config(&CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_opens_at_threshold() {
        let breaker = CircuitBreaker::new(5, Duration::from_secs(60));

        for _ in 0..4 {
            breaker.record_failure();
            assert!(breaker.allow_request());
        }
        breaker.record_failure();
        assert!(!breaker.allow_request());
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_success_resets_count() {
        let breaker = CircuitBreaker::new(5, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.failure_count(), 3);

        breaker.record_success();
        assert_eq!(breaker.failure_count(), 0);

        // Needs a full threshold again to open.
        for _ in 0..4 {
            breaker.record_failure();
        }
        assert!(breaker.allow_request());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_cooldown() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert!(!breaker.allow_request());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!breaker.allow_request());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(breaker.allow_request());
        assert_eq!(breaker.failure_count(), 0);
        assert_eq!(breaker.state(), CircuitState::Closed);

        // Closed outright: concurrent callers are all admitted.
        assert!(breaker.allow_request());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_while_open_closes_immediately() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        breaker.record_failure();
        assert!(!breaker.allow_request());

        breaker.record_success();
        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admits_single_trial() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(10)).with_half_open(true);
        breaker.record_failure();
        breaker.record_failure();
        assert!(!breaker.allow_request());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert_eq!(breaker.failure_count(), 0);
        assert!(breaker.allow_request());
        assert!(!breaker.allow_request());

        // Trial fails: straight back to open for another cooldown.
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(!breaker.allow_request());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(breaker.allow_request());
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.allow_request());
    }

    #[tokio::test(start_paused = true)]
    async fn test_neutral_outcome_frees_trial_slot() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(10)).with_half_open(true);
        breaker.record_failure();
        tokio::time::advance(Duration::from_secs(10)).await;

        assert!(breaker.allow_request());
        assert!(!breaker.allow_request());
        breaker.record_neutral();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.allow_request());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_trial_expires() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(10)).with_half_open(true);
        breaker.record_failure();
        tokio::time::advance(Duration::from_secs(10)).await;

        assert!(breaker.allow_request());
        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(!breaker.allow_request());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(breaker.allow_request());
    }

    #[tokio::test]
    async fn test_concurrent_failures_are_not_lost() {
        let breaker = Arc::new(CircuitBreaker::new(1_000, Duration::from_secs(60)));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let breaker = breaker.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..50 {
                    breaker.record_failure();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(breaker.failure_count(), 400);
        assert!(breaker.allow_request());
    }

    #[test]
    fn test_from_config() {
        let config = CircuitBreakerConfig {
            failure_threshold: 3,
            cooldown_secs: 5,
            half_open: true,
        };
        let breaker = CircuitBreaker::from_config(&config);
        assert_eq!(breaker.threshold(), 3);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
