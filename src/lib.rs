//! Resilient client core for a remote workflow-automation service.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller (dashboard, CLI)
//!       │
//!       ▼
//!   ┌──────────────────────── AutomationClient ────────────────────────┐
//!   │                                                                  │
//!   │  ResourceClient ──┐          ConnectionTracker ──┐               │
//!   │                   ▼                              ▼               │
//!   │              ┌──────────────── RequestExecutor ─────────────┐    │
//!   │              │ CircuitBreaker → CredentialProvider →        │    │
//!   │              │ RetryPolicy → deadline → HttpTransport       │    │
//!   │              └──────────────────────────────────────────────┘    │
//!   │                                                                  │
//!   │  Cross-cutting: config (TOML), observability (tracing, metrics)  │
//!   └──────────────────────────────────────────────────────────────────┘
//!       │
//!       ▼
//!   remote automation API
//! ```

// Core
pub mod client;
pub mod credentials;
pub mod transport;

// Resilience and health
pub mod health;
pub mod resilience;

// Cross-cutting concerns
pub mod config;
pub mod observability;

pub use client::{
    AutomationClient, ClassifiedError, ClientResult, ErrorKind, ListOptions, Page, ResourceClient,
};
pub use config::ClientConfig;
pub use credentials::{EnvResolver, FileResolver, SecretResolver, StaticResolver};
pub use health::{ConnectionReport, ConnectionStatus, ConnectionTracker};
pub use resilience::{CircuitBreaker, CircuitState, RetryPolicy};
