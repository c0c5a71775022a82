//! Manifest provider port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogEntry;

/// Where a catalog snapshot came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    /// Fetched from the manifest URL.
    Remote,
    /// Loaded from the last cached copy.
    Cache,
    /// Read from a local manifest file.
    File,
}

/// A parsed catalog plus provenance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// Parsed entries in manifest order.
    pub entries: Vec<CatalogEntry>,
    /// Provenance.
    pub source: CatalogSource,
    /// When the underlying document was obtained.
    pub fetched_at: DateTime<Utc>,
}

/// Errors from manifest providers.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest server answered with a non-success status.
    #[error("Manifest request failed with HTTP {status}: {url}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The request could not be completed.
    #[error("Manifest request failed: {0}")]
    Request(String),

    /// The document is not a valid manifest.
    #[error("Invalid manifest: {0}")]
    Parse(String),

    /// Reading or writing the manifest cache failed.
    #[error("Manifest cache error: {0}")]
    Cache(String),

    /// Offline and nothing cached.
    #[error("Manifest unavailable offline and no cached copy exists")]
    Unavailable,
}

/// Port for obtaining the catalog.
#[async_trait]
pub trait ManifestProviderPort: Send + Sync {
    /// Fetch the current catalog, falling back to a cached copy when possible.
    async fn fetch_catalog(&self) -> Result<CatalogSnapshot, ManifestError>;
}
