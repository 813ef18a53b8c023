//! Credential resolution with a short-lived cache.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::credentials::resolver::{RawCredentials, SecretResolver};
use crate::observability::metrics;

/// Validated service credentials.
///
/// Both fields are guaranteed non-empty and the base URL is an absolute
/// http(s) URL.
#[derive(Clone)]
pub struct Credentials {
    api_key: Arc<SecretString>,
    base_url: Url,
}

impl Credentials {
    /// Validate raw credentials, returning the reason they are unusable.
    pub fn from_raw(raw: RawCredentials) -> Result<Self, &'static str> {
        let api_key = raw.api_key.trim();
        let base_url = raw.base_url.trim();

        if api_key.is_empty() {
            return Err("api key is empty");
        }
        if HeaderValue::from_str(api_key).is_err() {
            return Err("api key cannot be sent as a header value");
        }
        if base_url.is_empty() {
            return Err("base url is empty");
        }

        let base_url = Url::parse(base_url).map_err(|_| "base url is not a valid URL")?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.host_str().is_none() {
            return Err("base url must be an absolute http(s) URL");
        }

        Ok(Self {
            api_key: Arc::new(SecretString::new(api_key.to_string())),
            base_url,
        })
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join an endpoint (path plus optional query) onto the base URL.
    ///
    /// The base URL's own path is kept, so `https://host/api/v1` joined with
    /// `/workflows` gives `https://host/api/v1/workflows`.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        if endpoint.starts_with('/') {
            Url::parse(&format!("{base}{endpoint}"))
        } else {
            Url::parse(&format!("{base}/{endpoint}"))
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

struct CachedCredentials {
    value: Option<Credentials>,
    resolved_at: Instant,
}

/// Resolves credentials through a [`SecretResolver`], caching the outcome.
///
/// Missing credentials are cached for the same window as valid ones so a
/// broken secret source is not hammered on every call.
pub struct CredentialProvider {
    resolver: Arc<dyn SecretResolver>,
    ttl: Duration,
    cache: Mutex<Option<CachedCredentials>>,
}

impl CredentialProvider {
    pub fn new(resolver: Arc<dyn SecretResolver>, ttl: Duration) -> Self {
        Self {
            resolver,
            ttl,
            cache: Mutex::new(None),
        }
    }

    /// Current credentials, or `None` if they cannot be resolved.
    ///
    /// The cache lock is held across the resolver call, so concurrent
    /// callers finding a stale cache trigger a single resolution.
    pub async fn resolve(&self) -> Option<Credentials> {
        let mut cache = self.cache.lock().await;

        if let Some(entry) = cache.as_ref() {
            if entry.resolved_at.elapsed() < self.ttl {
                return entry.value.clone();
            }
        }

        let value = match self.resolver.get_credentials().await {
            Ok(raw) => match Credentials::from_raw(raw) {
                Ok(credentials) => {
                    tracing::debug!(base_url = %credentials.base_url(), "Credentials resolved");
                    metrics::record_credential_resolution("resolved");
                    Some(credentials)
                }
                Err(reason) => {
                    tracing::warn!(reason, "Resolved credentials are incomplete");
                    metrics::record_credential_resolution("incomplete");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Credential resolution failed");
                metrics::record_credential_resolution("error");
                None
            }
        };

        *cache = Some(CachedCredentials {
            value: value.clone(),
            resolved_at: Instant::now(),
        });
        value
    }

    /// Drop the cached value so the next `resolve` asks the resolver again.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }
}

impl std::fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProvider").field("ttl", &self.ttl).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::resolver::ResolveError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingResolver {
        calls: AtomicU32,
        result: fn() -> Result<RawCredentials, ResolveError>,
    }

    impl CountingResolver {
        fn new(result: fn() -> Result<RawCredentials, ResolveError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                result,
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SecretResolver for CountingResolver {
        async fn get_credentials(&self) -> Result<RawCredentials, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn valid() -> Result<RawCredentials, ResolveError> {
        Ok(RawCredentials {
            api_key: "key-1".into(),
            base_url: "https://flows.example.com/api/v1".into(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_window() {
        let resolver = CountingResolver::new(valid);
        let provider = CredentialProvider::new(resolver.clone(), Duration::from_secs(60));

        assert!(provider.resolve().await.is_some());
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(provider.resolve().await.is_some());
        assert_eq!(resolver.calls(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(provider.resolve().await.is_some());
        assert_eq!(resolver.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_cached_as_absent() {
        let resolver =
            CountingResolver::new(|| Err(ResolveError::Unavailable("vault down".into())));
        let provider = CredentialProvider::new(resolver.clone(), Duration::from_secs(60));

        assert!(provider.resolve().await.is_none());
        assert!(provider.resolve().await.is_none());
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_incomplete_credentials_are_absent() {
        let resolver = CountingResolver::new(|| {
            Ok(RawCredentials {
                api_key: "   ".into(),
                base_url: "https://flows.example.com".into(),
            })
        });
        let provider = CredentialProvider::new(resolver.clone(), Duration::from_secs(60));
        assert!(provider.resolve().await.is_none());
        assert!(provider.resolve().await.is_none());
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_resolution() {
        let resolver = CountingResolver::new(valid);
        let provider = CredentialProvider::new(resolver.clone(), Duration::from_secs(60));

        provider.resolve().await;
        provider.invalidate().await;
        provider.resolve().await;
        assert_eq!(resolver.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_resolution_is_single_flight() {
        let resolver = CountingResolver::new(valid);
        let provider = CredentialProvider::new(resolver.clone(), Duration::from_secs(60));
        let provider = Arc::new(provider);

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let provider = provider.clone();
            tasks.push(tokio::spawn(async move { provider.resolve().await.is_some() }));
        }
        for task in tasks {
            assert!(task.await.unwrap());
        }
        assert_eq!(resolver.calls(), 1);
    }

    #[test]
    fn test_credential_validation() {
        let raw = |key: &str, url: &str| RawCredentials {
            api_key: key.into(),
            base_url: url.into(),
        };

        assert!(Credentials::from_raw(raw("k", "https://flows.example.com")).is_ok());
        assert_eq!(
            Credentials::from_raw(raw("", "https://x.io")).unwrap_err(),
            "api key is empty"
        );
        assert_eq!(
            Credentials::from_raw(raw("abc\ndef", "https://x.io")).unwrap_err(),
            "api key cannot be sent as a header value"
        );
        assert_eq!(Credentials::from_raw(raw("k", "")).unwrap_err(), "base url is empty");
        assert!(Credentials::from_raw(raw("k", "not a url")).is_err());
        assert!(Credentials::from_raw(raw("k", "ftp://flows.example.com")).is_err());
    }

    #[test]
    fn test_endpoint_url() {
        let creds = Credentials::from_raw(RawCredentials {
            api_key: "k".into(),
            base_url: "https://flows.example.com/api/v1/".into(),
        })
        .unwrap();

        assert_eq!(
            creds.endpoint_url("/workflows?limit=1").unwrap().as_str(),
            "https://flows.example.com/api/v1/workflows?limit=1"
        );
        assert_eq!(
            creds.endpoint_url("workflows/7/activate").unwrap().as_str(),
            "https://flows.example.com/api/v1/workflows/7/activate"
        );
        assert!(!format!("{creds:?}").contains("\"k\""));
    }
}
