//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Logical call to the service:
//!     → circuit_breaker.rs (fail fast while open)
//!     → retries.rs (retry transient failures with backoff.rs delays)
//!         → timeouts.rs (deadline on each attempt)
//!     → circuit_breaker.rs (record the final outcome)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a deadline
//! - Retries only for transient classifications (network, 5xx, 429)
//! - Circuit breaker prevents hammering an unhealthy service

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use retries::RetryPolicy;
