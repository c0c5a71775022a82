//! JSON-file implementation of the installed-state repository.
//!
//! The whole registry lives in one document keyed by package id. Every
//! mutation rewrites it through a temp file and rename, so a crash never
//! leaves a torn registry behind.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use arcade_core::{InstalledRecord, InstalledStateRepositoryPort, PackageId, RegistryError};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    games: BTreeMap<String, InstalledRecord>,
}

/// Installed records persisted as `installed.json`.
#[derive(Debug)]
pub struct JsonInstallRegistry {
    path: PathBuf,
    cache: Mutex<Option<BTreeMap<String, InstalledRecord>>>,
}

impl JsonInstallRegistry {
    /// Registry stored at `path`. Nothing is read until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// Registry file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, InstalledRecord>, RegistryError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(RegistryError::Storage(e.to_string())),
        };
        let document: RegistryDocument = serde_json::from_slice(&raw)
            .map_err(|e| RegistryError::Serialization(format!("{}: {e}", self.path.display())))?;
        Ok(document.games)
    }

    async fn persist(&self, games: &BTreeMap<String, InstalledRecord>) -> Result<(), RegistryError> {
        let document = RegistryDocument {
            version: FORMAT_VERSION,
            games: games.clone(),
        };
        let json = serde_json::to_vec_pretty(&document)
            .map_err(|e| RegistryError::Serialization(e.to_string()))?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, &json))
            .await
            .map_err(|e| RegistryError::Storage(e.to_string()))?
            .map_err(|e| RegistryError::Storage(e.to_string()))
    }

    /// Run `f` against the loaded map, persisting when it reports a change.
    async fn with_games<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, InstalledRecord>) -> (T, bool) + Send,
    ) -> Result<T, RegistryError> {
        let mut guard = self.cache.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        let Some(games) = guard.as_mut() else {
            return Err(RegistryError::Storage("registry not loaded".to_string()));
        };

        let mut next = games.clone();
        let (value, changed) = f(&mut next);
        if changed {
            self.persist(&next).await?;
            *games = next;
        }
        Ok(value)
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

#[async_trait]
impl InstalledStateRepositoryPort for JsonInstallRegistry {
    async fn list(&self) -> Result<Vec<InstalledRecord>, RegistryError> {
        self.with_games(|games| (games.values().cloned().collect(), false))
            .await
    }

    async fn get(&self, package_id: &PackageId) -> Result<Option<InstalledRecord>, RegistryError> {
        let key = package_id.as_str().to_string();
        self.with_games(move |games| (games.get(&key).cloned(), false))
            .await
    }

    async fn upsert(&self, record: &InstalledRecord) -> Result<(), RegistryError> {
        let record = record.clone();
        self.with_games(move |games| {
            games.insert(record.package_id.as_str().to_string(), record);
            ((), true)
        })
        .await
    }

    async fn remove(&self, package_id: &PackageId) -> Result<(), RegistryError> {
        let key = package_id.as_str().to_string();
        self.with_games(move |games| {
            let removed = games.remove(&key).is_some();
            ((), removed)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, version: &str) -> InstalledRecord {
        InstalledRecord::new(
            PackageId::from(id),
            version,
            PathBuf::from(format!("/games/{id}")),
            PathBuf::from("Game.exe"),
        )
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = JsonInstallRegistry::new(tmp.path().join("installed.json"));
        assert!(registry.list().await.unwrap().is_empty());
        assert!(!registry.path().exists());
    }

    #[tokio::test]
    async fn test_upsert_survives_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("installed.json");

        let registry = JsonInstallRegistry::new(&path);
        registry.upsert(&record("a", "1.0")).await.unwrap();
        registry.upsert(&record("a", "1.1")).await.unwrap();
        registry.upsert(&record("b", "2.0")).await.unwrap();

        let reopened = JsonInstallRegistry::new(&path);
        let a = reopened.get(&PackageId::from("a")).await.unwrap().unwrap();
        assert_eq!(a.installed_version, "1.1");
        assert_eq!(reopened.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_keeps_other_records() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = JsonInstallRegistry::new(tmp.path().join("installed.json"));
        for r in [record("a", "1.0"), record("y", "2"), record("x", "1")] {
            registry.upsert(&r).await.unwrap();
        }
        registry.remove(&PackageId::from("a")).await.unwrap();
        registry.remove(&PackageId::from("a")).await.unwrap();
        assert!(registry.get(&PackageId::from("a")).await.unwrap().is_none());

        let ids: Vec<_> = registry
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.package_id.to_string())
            .collect();
        assert_eq!(ids, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("installed.json");
        std::fs::write(&path, b"not json").unwrap();

        let err = JsonInstallRegistry::new(&path).list().await.unwrap_err();
        assert!(matches!(err, RegistryError::Serialization(_)));
    }
}
