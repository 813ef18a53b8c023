//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! executor, breaker, provider, tracker produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//! ```
//!
//! # Design Decisions
//! - Each logical call runs in a span carrying its request ID
//! - API keys are never logged
//! - Metrics go through the `metrics` facade; exporters are the app's choice

pub mod logging;
pub mod metrics;
