//! Reconcile the catalog and the registry against the install root.
//!
//! Subdirectories of the install root are matched to catalog ids by their
//! install marker, falling back to the directory name. Records whose
//! directory vanished are dropped; marked directories with no record are
//! adopted.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use arcade_core::{CatalogEntry, EntryStatus, InstallResult, InstalledRecord, PackageId};

use crate::executable::resolve_executable;
use crate::fsutil::blocking;
use crate::marker::InstallMarker;

/// What a scan found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Catalog entries with status annotated, in catalog order.
    pub entries: Vec<CatalogEntry>,
    /// Corrected installed records.
    pub records: Vec<InstalledRecord>,
    /// Whether `records` differs from the records passed in.
    pub records_changed: bool,
}

/// A directory under the install root.
#[derive(Debug)]
struct FoundDir {
    dir: PathBuf,
    marker: Option<InstallMarker>,
}

/// Walks the install root.
#[derive(Debug, Clone)]
pub struct ScanReconciler {
    install_root: PathBuf,
}

impl ScanReconciler {
    /// Reconciler over `install_root`.
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
        }
    }

    /// Install root being scanned.
    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Scan on the blocking pool.
    pub async fn scan(
        &self,
        catalog: Vec<CatalogEntry>,
        records: Vec<InstalledRecord>,
    ) -> InstallResult<ScanReport> {
        let root = self.install_root.clone();
        blocking(move || Ok(scan_blocking(&root, catalog, &records))).await
    }
}

fn scan_blocking(
    root: &Path,
    mut catalog: Vec<CatalogEntry>,
    records: &[InstalledRecord],
) -> ScanReport {
    let found = match read_install_root(root) {
        Ok(found) => found,
        Err(e) => {
            tracing::debug!(target: "arcade.install", root = %root.display(), error = %e, "Install root unreadable, treating as empty");
            HashMap::new()
        }
    };

    let mut kept: Vec<InstalledRecord> = records
        .iter()
        .filter(|r| {
            let exists = r.install_dir.is_dir();
            if !exists {
                tracing::info!(
                    target: "arcade.install",
                    package_id = %r.package_id,
                    dir = %r.install_dir.display(),
                    "Install directory vanished, dropping record"
                );
            }
            exists
        })
        .cloned()
        .collect();

    let known: HashSet<PackageId> = kept.iter().map(|r| r.package_id.clone()).collect();
    let catalog_ids: HashSet<&PackageId> = catalog.iter().map(|e| &e.id).collect();
    let mut adopted: Vec<InstalledRecord> = found
        .iter()
        .filter(|(id, _)| !known.contains(*id) && catalog_ids.contains(id))
        .filter_map(|(_, f)| adopt(f))
        .collect();
    adopted.sort_by(|a, b| a.package_id.cmp(&b.package_id));
    kept.extend(adopted);

    let by_id: HashMap<&PackageId, &InstalledRecord> =
        kept.iter().map(|r| (&r.package_id, r)).collect();

    for entry in &mut catalog {
        let (present, version) = match by_id.get(&entry.id) {
            Some(record) => (record.is_present(), Some(record.installed_version.clone())),
            None => found.get(&entry.id).map_or((false, None), |f| {
                let present = runnable(f, entry.executable_hint.as_deref()).is_some();
                (present, f.marker.as_ref().map(|m| m.version.clone()))
            }),
        };
        entry.status = EntryStatus::resolve(
            entry.is_coming_soon,
            present,
            version.as_deref(),
            &entry.version,
        );
    }

    let records_changed = kept.as_slice() != records;
    ScanReport {
        entries: catalog,
        records: kept,
        records_changed,
    }
}

fn read_install_root(root: &Path) -> std::io::Result<HashMap<PackageId, FoundDir>> {
    let mut found = HashMap::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !entry.file_type()?.is_dir() {
            continue;
        }
        let dir = entry.path();
        let marker = InstallMarker::read(&dir);
        let id = marker
            .as_ref()
            .map_or_else(|| PackageId::from(name), |m| m.package_id.clone());

        // A marked directory beats one that only matches by name.
        let replace = match found.get(&id) {
            Some(FoundDir { marker: Some(_), .. }) => false,
            Some(FoundDir { marker: None, .. }) => marker.is_some(),
            None => true,
        };
        if replace {
            found.insert(id, FoundDir { dir, marker });
        }
    }
    Ok(found)
}

fn runnable(found: &FoundDir, hint: Option<&str>) -> Option<PathBuf> {
    if let Some(marker) = &found.marker {
        if found.dir.join(&marker.executable).is_file() {
            return Some(marker.executable.clone());
        }
    }
    resolve_executable(&found.dir, hint).ok().flatten()
}

fn adopt(found: &FoundDir) -> Option<InstalledRecord> {
    let marker = found.marker.as_ref()?;
    let executable = runnable(found, None)?;
    tracing::info!(
        target: "arcade.install",
        package_id = %marker.package_id,
        version = %marker.version,
        dir = %found.dir.display(),
        "Adopting unregistered install"
    );
    let mut record = InstalledRecord::new(
        marker.package_id.clone(),
        marker.version.clone(),
        found.dir.clone(),
        executable,
    );
    record.installed_at = marker.installed_at;
    record.updated_at = marker.installed_at;
    Some(record)
}
