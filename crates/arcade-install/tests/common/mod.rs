//! Shared fixtures: a scripted launcher over a temp directory.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use arcade_core::{
    CatalogEntry, CatalogSnapshot, CatalogSource, InstallEvent, InstalledRecord,
    InstalledStateRepositoryPort, ManifestError, ManifestProviderPort, Mirror, PackageId,
    RegistryError, ResolvedPaths,
};
use arcade_download::EngineConfig;
use arcade_download::transport::testing::{MirrorScript, ScriptedTransport};
use arcade_install::{DiskBudget, DiskSpaceProbe, JsonInstallRegistry, Launcher, LauncherDeps};

pub const STELLAR_QUEST: &str = "stellar_quest";

/// Manifest provider whose catalog tests can swap.
#[derive(Default)]
pub struct FakeManifest {
    entries: Mutex<Vec<CatalogEntry>>,
}

impl FakeManifest {
    pub fn set(&self, entries: Vec<CatalogEntry>) {
        *self.entries.lock().unwrap() = entries;
    }
}

#[async_trait]
impl ManifestProviderPort for FakeManifest {
    async fn fetch_catalog(&self) -> Result<CatalogSnapshot, ManifestError> {
        Ok(CatalogSnapshot {
            entries: self.entries.lock().unwrap().clone(),
            source: CatalogSource::Remote,
            fetched_at: Utc::now(),
        })
    }
}

/// JSON registry whose writes can be switched to fail.
pub struct FlakyRegistry {
    inner: JsonInstallRegistry,
    fail_writes: AtomicBool,
}

impl FlakyRegistry {
    fn new(path: &Path) -> Self {
        Self {
            inner: JsonInstallRegistry::new(path),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RegistryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(RegistryError::Storage("disk full".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl InstalledStateRepositoryPort for FlakyRegistry {
    async fn list(&self) -> Result<Vec<InstalledRecord>, RegistryError> {
        self.inner.list().await
    }

    async fn get(&self, package_id: &PackageId) -> Result<Option<InstalledRecord>, RegistryError> {
        self.inner.get(package_id).await
    }

    async fn upsert(&self, record: &InstalledRecord) -> Result<(), RegistryError> {
        self.check()?;
        self.inner.upsert(record).await
    }

    async fn remove(&self, package_id: &PackageId) -> Result<(), RegistryError> {
        self.check()?;
        self.inner.remove(package_id).await
    }
}

/// Free space is never known, so every reservation is granted.
struct UnknownFreeSpace;

impl DiskSpaceProbe for UnknownFreeSpace {
    fn available_bytes(&self, _path: &Path) -> Option<u64> {
        None
    }
}

pub struct Fixture {
    pub tmp: tempfile::TempDir,
    pub paths: ResolvedPaths,
    pub transport: ScriptedTransport,
    pub manifest: Arc<FakeManifest>,
    pub registry: Arc<FlakyRegistry>,
    pub launcher: Launcher,
}

impl Fixture {
    /// Launcher with `entries` loaded and the install root scanned.
    pub async fn new(entries: Vec<CatalogEntry>) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let paths = ResolvedPaths::from_roots(&tmp.path().join("data"), &tmp.path().join("games"));
        let transport = ScriptedTransport::new();
        let manifest = Arc::new(FakeManifest::default());
        manifest.set(entries);
        let registry = Arc::new(FlakyRegistry::new(&paths.registry_path));

        let launcher = Launcher::new(LauncherDeps {
            paths: paths.clone(),
            transport: Arc::new(transport.clone()),
            engine: EngineConfig {
                attempt_timeout: Duration::from_millis(200),
                progress_interval: Duration::from_millis(1),
                speed_window: Duration::from_secs(1),
            },
            manifest: Arc::clone(&manifest) as Arc<dyn ManifestProviderPort>,
            registry: Arc::clone(&registry) as Arc<dyn InstalledStateRepositoryPort>,
            disk: DiskBudget::new(Arc::new(UnknownFreeSpace)),
            space_percent: 250,
        });
        launcher.refresh_catalog().await.unwrap();
        launcher.scan().await.unwrap();

        Self {
            tmp,
            paths,
            transport,
            manifest,
            registry,
            launcher,
        }
    }

    /// Publish a new catalog and reload it.
    pub async fn publish(&self, entries: Vec<CatalogEntry>) {
        self.manifest.set(entries);
        self.launcher.refresh_catalog().await.unwrap();
    }

    /// Serve a valid game archive for `version` on `mirror`.
    pub fn serve_game(&self, mirror: &Mirror, version: &str) {
        self.transport
            .set(&mirror.url, MirrorScript::serve(game_zip("StellarQuest", version)));
    }

    /// Directory names under the package's backup folder.
    pub fn backup_dirs(&self) -> Vec<String> {
        std::fs::read_dir(self.paths.backups_dir.join(STELLAR_QUEST)).map_or_else(
            |_| Vec::new(),
            |d| {
                d.map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                    .collect()
            },
        )
    }

    /// Whether any staging leftovers remain.
    pub fn staging_is_empty(&self) -> bool {
        std::fs::read_dir(&self.paths.staging_dir).map_or(true, |mut d| d.next().is_none())
    }
}

pub fn primary(version: &str) -> Mirror {
    Mirror::new("Primary", format!("https://primary.example/sq-{version}.zip")).primary()
}

pub fn secondary(version: &str) -> Mirror {
    Mirror::new("Secondary", format!("https://secondary.example/sq-{version}.zip"))
}

/// `stellar_quest` at `version` with a primary and a secondary mirror.
pub fn stellar_quest(version: &str) -> CatalogEntry {
    let mut entry = CatalogEntry::new(STELLAR_QUEST, "Stellar Quest", version);
    entry.mirrors = vec![secondary(version), primary(version)];
    entry.executable_hint = Some("StellarQuest.exe".to_string());
    entry.repair_enabled = true;
    entry.changelog = Some(format!("Release {version}"));
    entry
}

/// A zip wrapping everything in `root/`, with the game, an uninstaller and a
/// data file recording `version`.
pub fn game_zip(root: &str, version: &str) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, body) in [
        ("StellarQuest.exe", b"MZ game".as_slice()),
        ("unins000.exe", b"MZ uninstall".as_slice()),
        ("data/version.txt", version.as_bytes()),
    ] {
        zip.start_file(format!("{root}/{name}"), options).unwrap();
        zip.write_all(body).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn statuses(events: &[InstallEvent]) -> Vec<arcade_core::EventStatus> {
    events.iter().map(|e| e.status).collect()
}
