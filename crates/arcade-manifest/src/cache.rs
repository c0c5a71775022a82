//! On-disk copy of the last successfully fetched manifest.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use arcade_core::ManifestError;

#[derive(Debug, Serialize, Deserialize)]
struct CachedManifest {
    fetched_at: DateTime<Utc>,
    url: String,
    body: String,
}

/// A manifest body loaded from the cache.
#[derive(Debug, Clone)]
pub struct CachedCopy {
    /// When the body was fetched from the network.
    pub fetched_at: DateTime<Utc>,
    /// URL it was fetched from.
    pub url: String,
    /// Raw manifest JSON.
    pub body: String,
}

/// Reads and atomically replaces the cached manifest.
#[derive(Debug, Clone)]
pub struct ManifestCache {
    path: PathBuf,
}

impl ManifestCache {
    /// Cache stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached copy, or `None` when nothing has been cached yet.
    pub async fn load(&self) -> Result<Option<CachedCopy>, ManifestError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ManifestError::Cache(e.to_string())),
        };
        let cached: CachedManifest =
            serde_json::from_str(&raw).map_err(|e| ManifestError::Cache(e.to_string()))?;
        Ok(Some(CachedCopy {
            fetched_at: cached.fetched_at,
            url: cached.url,
            body: cached.body,
        }))
    }

    /// Replace the cached copy. Readers never observe a partial file.
    pub async fn store(
        &self,
        url: &str,
        body: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), ManifestError> {
        let document = CachedManifest {
            fetched_at,
            url: url.to_string(),
            body: body.to_string(),
        };
        let json = serde_json::to_vec_pretty(&document)
            .map_err(|e| ManifestError::Cache(e.to_string()))?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, &json))
            .await
            .map_err(|e| ManifestError::Cache(e.to_string()))?
            .map_err(|e| ManifestError::Cache(e.to_string()))
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_cache_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ManifestCache::new(tmp.path().join("cache/manifest.json"));
        assert!(cache.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ManifestCache::new(tmp.path().join("cache/manifest.json"));
        let at = Utc::now();

        cache
            .store("https://x.example/m.json", r#"{"games":[]}"#, at)
            .await
            .unwrap();
        let copy = cache.load().await.unwrap().unwrap();

        assert_eq!(copy.body, r#"{"games":[]}"#);
        assert_eq!(copy.url, "https://x.example/m.json");
        assert_eq!(copy.fetched_at, at);
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("manifest.json");
        std::fs::write(&path, "not json").unwrap();

        let err = ManifestCache::new(&path).load().await.unwrap_err();
        assert!(matches!(err, ManifestError::Cache(_)));
    }
}
