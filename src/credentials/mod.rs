//! Credential subsystem.
//!
//! # Data Flow
//! ```text
//! secret source (env, file, vault, ...)
//!     → resolver.rs (SecretResolver → RawCredentials)
//!     → provider.rs (validate, cache for a short window)
//!     → Credentials handed to the request executor
//! ```
//!
//! # Security Constraints
//! - API keys live in `SecretString` and are redacted from `Debug`
//! - Resolver failures degrade to "no credentials", never a panic

pub mod provider;
pub mod resolver;

pub use provider::{CredentialProvider, Credentials};
pub use resolver::{
    EnvResolver, FileResolver, RawCredentials, ResolveError, SecretResolver, StaticResolver,
};
