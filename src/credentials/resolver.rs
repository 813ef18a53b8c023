//! Secret resolvers: where the API key and base URL come from.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Credentials exactly as the secret source returned them, before validation.
#[derive(Clone, Default, Deserialize)]
pub struct RawCredentials {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
}

impl std::fmt::Debug for RawCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawCredentials")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Errors raised by a secret source.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The source has no entry for the requested secret.
    #[error("secret not found: {0}")]
    NotFound(String),

    /// The source exists but could not be read.
    #[error("secret source unavailable: {0}")]
    Unavailable(String),

    /// The source returned something unparseable.
    #[error("malformed secret: {0}")]
    Malformed(String),
}

/// Anything that can hand out the service credentials.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn get_credentials(&self) -> Result<RawCredentials, ResolveError>;
}

/// Reads credentials from two environment variables.
#[derive(Debug, Clone)]
pub struct EnvResolver {
    api_key_var: String,
    base_url_var: String,
}

impl EnvResolver {
    pub fn new(api_key_var: impl Into<String>, base_url_var: impl Into<String>) -> Self {
        Self {
            api_key_var: api_key_var.into(),
            base_url_var: base_url_var.into(),
        }
    }
}

impl Default for EnvResolver {
    fn default() -> Self {
        Self::new("AUTOMATION_API_KEY", "AUTOMATION_BASE_URL")
    }
}

#[async_trait]
impl SecretResolver for EnvResolver {
    async fn get_credentials(&self) -> Result<RawCredentials, ResolveError> {
        let read = |var: &str| {
            std::env::var(var).map_err(|_| ResolveError::NotFound(var.to_string()))
        };
        Ok(RawCredentials {
            api_key: read(&self.api_key_var)?,
            base_url: read(&self.base_url_var)?,
        })
    }
}

/// Reads credentials from a JSON file `{ "api_key": ..., "base_url": ... }`.
///
/// The file is re-read on every call; caching is the provider's job.
#[derive(Debug, Clone)]
pub struct FileResolver {
    path: PathBuf,
}

impl FileResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SecretResolver for FileResolver {
    async fn get_credentials(&self) -> Result<RawCredentials, ResolveError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ResolveError::NotFound(self.path.display().to_string()))
            }
            Err(e) => {
                let detail = format!("{}: {}", self.path.display(), e);
                return Err(ResolveError::Unavailable(detail));
            }
        };

        serde_json::from_str(&contents).map_err(|e| ResolveError::Malformed(e.to_string()))
    }
}

/// Fixed credentials, for embedding and tests.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    credentials: RawCredentials,
}

impl StaticResolver {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            credentials: RawCredentials {
                api_key: api_key.into(),
                base_url: base_url.into(),
            },
        }
    }
}

#[async_trait]
impl SecretResolver for StaticResolver {
    async fn get_credentials(&self) -> Result<RawCredentials, ResolveError> {
        Ok(self.credentials.clone())
    }
}
