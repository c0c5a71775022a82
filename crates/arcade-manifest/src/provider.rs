//! Manifest provider implementations.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use url::Url;

use arcade_core::{
    CatalogSnapshot, CatalogSource, ManifestError, ManifestProviderPort, NetworkProbePort,
    parse_manifest,
};

use crate::cache::ManifestCache;
use crate::http::HttpBackend;

/// Fetches the manifest over HTTP and falls back to the cached copy.
///
/// A successful fetch refreshes the cache. The cache is used when the probe
/// reports the machine offline, or when the fetch or parse fails.
pub struct HttpManifestProvider<B: HttpBackend> {
    backend: B,
    url: Url,
    cache: ManifestCache,
    probe: Option<Arc<dyn NetworkProbePort>>,
}

impl<B: HttpBackend> HttpManifestProvider<B> {
    /// Create a provider for `url`.
    pub fn new(backend: B, url: Url, cache: ManifestCache) -> Self {
        Self {
            backend,
            url,
            cache,
            probe: None,
        }
    }

    /// Consult `probe` before going to the network.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn NetworkProbePort>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Manifest URL.
    pub const fn url(&self) -> &Url {
        &self.url
    }

    async fn fetch_remote(&self) -> Result<CatalogSnapshot, ManifestError> {
        let body = self.backend.get_text(&self.url).await?;
        let entries = parse_manifest(&body)?;
        let fetched_at = Utc::now();

        if let Err(e) = self.cache.store(self.url.as_str(), &body, fetched_at).await {
            tracing::warn!(path = %self.cache.path().display(), error = %e, "Failed to cache manifest");
        }

        tracing::info!(url = %self.url, games = entries.len(), "Fetched manifest");
        Ok(CatalogSnapshot {
            entries,
            source: CatalogSource::Remote,
            fetched_at,
        })
    }

    async fn from_cache(&self) -> Result<Option<CatalogSnapshot>, ManifestError> {
        let Some(copy) = self.cache.load().await? else {
            return Ok(None);
        };
        let entries = parse_manifest(&copy.body)?;
        tracing::info!(
            fetched_at = %copy.fetched_at,
            games = entries.len(),
            "Using cached manifest"
        );
        Ok(Some(CatalogSnapshot {
            entries,
            source: CatalogSource::Cache,
            fetched_at: copy.fetched_at,
        }))
    }
}

#[async_trait]
impl<B: HttpBackend> ManifestProviderPort for HttpManifestProvider<B> {
    async fn fetch_catalog(&self) -> Result<CatalogSnapshot, ManifestError> {
        let offline = self
            .probe
            .as_ref()
            .is_some_and(|p| !p.status().may_be_online());

        if offline {
            tracing::debug!("Network probe reports offline; skipping manifest fetch");
            return self.from_cache().await?.ok_or(ManifestError::Unavailable);
        }

        match self.fetch_remote().await {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                tracing::warn!(url = %self.url, error = %err, "Manifest fetch failed, trying cache");
                match self.from_cache().await {
                    Ok(Some(snapshot)) => Ok(snapshot),
                    Ok(None) => Err(err),
                    Err(cache_err) => {
                        tracing::warn!(error = %cache_err, "Cached manifest unusable");
                        Err(err)
                    }
                }
            }
        }
    }
}

/// Reads the manifest from a local file.
#[derive(Debug, Clone)]
pub struct FileManifestProvider {
    path: PathBuf,
}

impl FileManifestProvider {
    /// Provider reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ManifestProviderPort for FileManifestProvider {
    async fn fetch_catalog(&self) -> Result<CatalogSnapshot, ManifestError> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ManifestError::Request(format!("{}: {e}", self.path.display())))?;
        Ok(CatalogSnapshot {
            entries: parse_manifest(&body)?,
            source: CatalogSource::File,
            fetched_at: Utc::now(),
        })
    }
}
