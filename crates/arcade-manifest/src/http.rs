//! HTTP backend abstraction for manifest fetches.
//!
//! The provider and the network probe talk to a small trait so they can be
//! tested without sockets. The production implementation uses reqwest with
//! exponential backoff for transient errors.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::ManifestClientConfig;
use crate::error::{FetchError, FetchResult};

// ============================================================================
// HTTP Backend Trait
// ============================================================================

/// Minimal HTTP surface needed by the manifest provider and the probe.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// GET `url` and return the body as text.
    async fn get_text(&self, url: &Url) -> FetchResult<String>;

    /// Check that `url` answers at all (any status below 500 counts).
    async fn reachable(&self, url: &Url) -> FetchResult<()>;
}

// ============================================================================
// Reqwest Backend
// ============================================================================

/// Production HTTP backend using reqwest with retry logic.
///
/// Implements exponential backoff for transient server errors (5xx)
/// and network errors.
pub struct ReqwestBackend {
    client: reqwest::Client,
    max_retries: u8,
    retry_base_delay: Duration,
}

impl ReqwestBackend {
    /// Create a backend from the client configuration.
    pub fn new(config: &ManifestClientConfig) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
        })
    }

    /// Fetch a URL with automatic retry for transient errors.
    async fn fetch_with_retry(&self, url: &Url) -> FetchResult<reqwest::Response> {
        let mut last_error: Option<FetchError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_base_delay * 2u32.pow(u32::from(attempt) - 1);
                tracing::debug!(url = %url, attempt, ?delay, "Retrying manifest fetch");
                tokio::time::sleep(delay).await;
            }

            match self.client.get(url.as_str()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    // 5xx errors are retryable (server-side issues)
                    if status.is_server_error() && attempt < self.max_retries {
                        last_error = Some(FetchError::Status {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                        continue;
                    }

                    // 4xx errors or final attempt - fail immediately
                    return Err(FetchError::Status {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                Err(e) => {
                    // Network errors are retryable
                    if attempt < self.max_retries {
                        last_error = Some(e.into());
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::Other("unknown error during fetch".to_string())))
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get_text(&self, url: &Url) -> FetchResult<String> {
        let response = self.fetch_with_retry(url).await?;
        Ok(response.text().await?)
    }

    async fn reachable(&self, url: &Url) -> FetchResult<()> {
        let response = self.client.head(url.as_str()).send().await?;
        let status = response.status();
        if status.is_server_error() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Canned response for the fake backend.
    #[derive(Clone, Debug)]
    pub enum CannedResponse {
        /// 200 with this body.
        Body(String),
        /// Non-success status.
        Status(u16),
        /// Connection failure.
        Offline,
    }

    /// A fake HTTP backend that returns canned responses.
    ///
    /// Unknown URLs answer 404. Clones share responses and counters.
    #[derive(Clone, Default)]
    pub struct FakeBackend {
        responses: Arc<Mutex<HashMap<String, CannedResponse>>>,
        requests: Arc<AtomicUsize>,
    }

    impl FakeBackend {
        /// Create a new fake backend.
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a canned response for a URL.
        pub fn with_response(self, url: &str, response: CannedResponse) -> Self {
            self.set(url, response);
            self
        }

        /// Replace the response for a URL.
        pub fn set(&self, url: &str, response: CannedResponse) {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), response);
        }

        /// Number of requests served.
        pub fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }

        fn respond(&self, url: &Url) -> CannedResponse {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .get(url.as_str())
                .cloned()
                .unwrap_or(CannedResponse::Status(404))
        }
    }

    #[async_trait]
    impl HttpBackend for FakeBackend {
        async fn get_text(&self, url: &Url) -> FetchResult<String> {
            match self.respond(url) {
                CannedResponse::Body(body) => Ok(body),
                CannedResponse::Status(status) => Err(FetchError::Status {
                    status,
                    url: url.to_string(),
                }),
                CannedResponse::Offline => Err(FetchError::Other("connection refused".to_string())),
            }
        }

        async fn reachable(&self, url: &Url) -> FetchResult<()> {
            match self.respond(url) {
                CannedResponse::Offline => Err(FetchError::Other("connection refused".to_string())),
                CannedResponse::Status(status) if status >= 500 => Err(FetchError::Status {
                    status,
                    url: url.to_string(),
                }),
                _ => Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{CannedResponse, FakeBackend};
    use super::*;

    #[test]
    fn test_reqwest_backend_creation() {
        let config = ManifestClientConfig::default();
        assert!(ReqwestBackend::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_fake_backend_unknown_url_is_404() {
        let backend = FakeBackend::new();
        let url = Url::parse("https://x.example/missing.json").unwrap();
        let err = backend.get_text(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(backend.requests(), 1);
    }

    #[tokio::test]
    async fn test_fake_backend_reachable_ignores_client_errors() {
        let url = Url::parse("https://x.example/").unwrap();
        let backend = FakeBackend::new().with_response(url.as_str(), CannedResponse::Status(403));
        assert!(backend.reachable(&url).await.is_ok());

        backend.set(url.as_str(), CannedResponse::Offline);
        assert!(backend.reachable(&url).await.is_err());
    }
}
