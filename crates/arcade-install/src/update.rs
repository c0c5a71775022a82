//! Update checks, backup snapshots and rollback.
//!
//! Applying an update moves the live directory into a timestamped snapshot
//! before downloading the new version. If anything fails the snapshot is moved
//! back, so the package stays playable at the version it had.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use arcade_core::{
    BackupSnapshot, InstallError, InstallResult, InstalledRecord, PackageId, is_newer,
};
use arcade_download::SessionHandle;

use crate::executable::resolve_executable;
use crate::fsutil::{blocking, move_dir, remove_dir_quietly};
use crate::installer::PackageInstaller;
use crate::marker::InstallMarker;
use crate::pipeline::InstalledPaths;
use crate::store::CatalogStore;

/// Answer to "is there a newer version?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCheck {
    /// Package checked.
    pub package_id: PackageId,
    /// Version compared against the catalog.
    pub current_version: String,
    /// Catalog version.
    pub latest_version: String,
    /// Whether the catalog version is strictly newer.
    pub needs_update: bool,
    /// Catalog changelog, if any.
    pub changelog: Option<String>,
}

/// Version checks, updates and backup management.
pub struct UpdateManager {
    installer: Arc<PackageInstaller>,
    catalog: Arc<CatalogStore>,
}

impl UpdateManager {
    /// Create a manager.
    pub const fn new(installer: Arc<PackageInstaller>, catalog: Arc<CatalogStore>) -> Self {
        Self { installer, catalog }
    }

    async fn record(&self, package_id: &PackageId) -> InstallResult<InstalledRecord> {
        self.installer
            .registry()
            .get(package_id)
            .await?
            .ok_or_else(|| InstallError::not_installed(package_id))
    }

    /// Compare the installed version with the catalog.
    pub async fn check_update(&self, package_id: &PackageId) -> InstallResult<UpdateCheck> {
        let record = self.record(package_id).await?;
        self.check_update_against(package_id, &record.installed_version)
    }

    /// Compare an explicit version with the catalog.
    pub fn check_update_against(
        &self,
        package_id: &PackageId,
        current_version: &str,
    ) -> InstallResult<UpdateCheck> {
        let entry = self.catalog.require(package_id)?;
        Ok(UpdateCheck {
            package_id: package_id.clone(),
            current_version: current_version.to_string(),
            needs_update: is_newer(&entry.version, current_version),
            latest_version: entry.version,
            changelog: entry.changelog,
        })
    }

    /// Replace the live install with the catalog version.
    pub async fn apply_update(
        &self,
        session: &SessionHandle,
    ) -> InstallResult<(InstalledRecord, InstalledPaths)> {
        let package_id = session.package_id();
        let entry = self.catalog.require(package_id)?;
        let mut record = self.record(package_id).await?;
        if !is_newer(&entry.version, &record.installed_version) {
            return Err(InstallError::UpToDate {
                package_id: package_id.to_string(),
                version: record.installed_version,
            });
        }

        let snapshot = self.snapshot_live(&record).await?;
        let installed = match self.installer.acquire(&entry, &record.install_dir, session).await {
            Ok(installed) => installed,
            Err(e) => {
                roll_back(snapshot.as_ref(), &record.install_dir).await;
                return Err(e);
            }
        };

        tracing::info!(
            target: "arcade.install",
            package_id = %package_id,
            from = %record.installed_version,
            to = %entry.version,
            "Update applied"
        );

        record.installed_version.clone_from(&entry.version);
        record.executable_rel_path.clone_from(&installed.executable_rel);
        record.updated_at = Utc::now();
        let evicted = snapshot
            .clone()
            .map(|s| record.push_backup(s))
            .unwrap_or_default();
        if let Err(e) = self.installer.registry().upsert(&record).await {
            tracing::warn!(target: "arcade.install", package_id = %package_id, error = %e, "Registry write failed, rolling back update");
            roll_back(snapshot.as_ref(), &record.install_dir).await;
            return Err(e.into());
        }
        prune(evicted).await;

        Ok((record, installed))
    }

    /// Retained snapshots for a package, oldest first.
    pub async fn list_backups(&self, package_id: &PackageId) -> InstallResult<Vec<BackupSnapshot>> {
        Ok(self.record(package_id).await?.backups)
    }

    /// Make a retained snapshot live again.
    ///
    /// The current live directory becomes a snapshot in its place, subject to
    /// the usual cap.
    pub async fn restore_backup(
        &self,
        session: &SessionHandle,
        version: &str,
    ) -> InstallResult<(InstalledRecord, PathBuf)> {
        let package_id = session.package_id();
        let mut record = self.record(package_id).await?;
        let Some(target) = record.take_backup(version) else {
            return Err(InstallError::BackupNotFound {
                package_id: package_id.to_string(),
                version: version.to_string(),
            });
        };
        if !target.path.is_dir() {
            return Err(InstallError::BackupNotFound {
                package_id: package_id.to_string(),
                version: version.to_string(),
            });
        }

        let displaced = self.snapshot_live(&record).await?;
        let install_dir = record.install_dir.clone();
        let from = target.path.clone();
        let moved = blocking(move || {
            move_dir(&from, &install_dir)
                .map_err(|e| InstallError::io_context("restoring backup", &e))
        })
        .await;
        if let Err(e) = moved {
            roll_back(displaced.as_ref(), &record.install_dir).await;
            return Err(e);
        }

        let executable_rel = match locate_executable(&record.install_dir, &record).await {
            Ok(rel) => rel,
            Err(e) => {
                tracing::warn!(target: "arcade.install", package_id = %package_id, error = %e, "Keeping recorded executable path");
                record.executable_rel_path.clone()
            }
        };

        tracing::info!(
            target: "arcade.install",
            package_id = %package_id,
            from = %record.installed_version,
            to = %target.version,
            "Backup restored"
        );

        let restored_from = target.path.clone();
        record.installed_version = target.version;
        record.executable_rel_path = executable_rel;
        record.updated_at = Utc::now();
        let evicted = displaced
            .clone()
            .map(|s| record.push_backup(s))
            .unwrap_or_default();
        if let Err(e) = self.installer.registry().upsert(&record).await {
            tracing::warn!(target: "arcade.install", package_id = %package_id, error = %e, "Registry write failed, putting backup back");
            let install_dir = record.install_dir.clone();
            let back = blocking(move || {
                move_dir(&install_dir, &restored_from)
                    .map_err(|e| InstallError::io_context("returning backup", &e))
            })
            .await;
            match back {
                Ok(()) => roll_back(displaced.as_ref(), &record.install_dir).await,
                Err(move_err) => {
                    tracing::error!(target: "arcade.install", package_id = %package_id, error = %move_err, "Failed to return backup");
                }
            }
            return Err(e.into());
        }
        prune(evicted).await;

        let executable = record.executable_path();
        Ok((record, executable))
    }

    /// Move the live directory into a new snapshot. `None` when there is no
    /// live directory to keep.
    async fn snapshot_live(&self, record: &InstalledRecord) -> InstallResult<Option<BackupSnapshot>> {
        if !record.install_dir.is_dir() {
            tracing::warn!(
                target: "arcade.install",
                package_id = %record.package_id,
                dir = %record.install_dir.display(),
                "Live install missing, no backup taken"
            );
            return Ok(None);
        }

        let created_at = Utc::now();
        let path = backup_path(
            &self.installer.paths().backups_dir,
            &record.package_id,
            &record.installed_version,
            created_at,
        );
        let from = record.install_dir.clone();
        let to = path.clone();
        blocking(move || {
            move_dir(&from, &to).map_err(|e| InstallError::io_context("creating backup", &e))
        })
        .await?;

        tracing::debug!(target: "arcade.install", package_id = %record.package_id, path = %path.display(), "Backup created");
        Ok(Some(BackupSnapshot {
            version: record.installed_version.clone(),
            created_at,
            path,
        }))
    }
}

impl std::fmt::Debug for UpdateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateManager").finish_non_exhaustive()
    }
}

/// `<backups>/<id>/<version>-<timestamp>`.
pub fn backup_path(
    backups_dir: &Path,
    package_id: &PackageId,
    version: &str,
    created_at: DateTime<Utc>,
) -> PathBuf {
    let version: String = version
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    backups_dir
        .join(package_id.as_str())
        .join(format!("{version}-{}", created_at.format("%Y%m%dT%H%M%S%3fZ")))
}

/// Put `install_dir` back the way it was before a snapshot was taken.
///
/// Without a snapshot there was no live directory, so whatever is there now
/// is removed.
async fn roll_back(snapshot: Option<&BackupSnapshot>, install_dir: &Path) {
    match snapshot {
        Some(snapshot) => restore_snapshot(snapshot, install_dir).await,
        None => {
            let dir = install_dir.to_path_buf();
            if let Err(e) = tokio::task::spawn_blocking(move || remove_dir_quietly(&dir)).await {
                tracing::warn!(target: "arcade.install", error = %e, "Cleanup task failed");
            }
        }
    }
}

async fn restore_snapshot(snapshot: &BackupSnapshot, install_dir: &Path) {
    let from = snapshot.path.clone();
    let to = install_dir.to_path_buf();
    let restored = blocking(move || {
        remove_dir_quietly(&to);
        move_dir(&from, &to).map_err(|e| InstallError::io_context("restoring backup", &e))
    })
    .await;
    match restored {
        Ok(()) => {
            tracing::info!(target: "arcade.install", version = %snapshot.version, "Previous install restored");
        }
        Err(e) => {
            tracing::error!(
                target: "arcade.install",
                snapshot = %snapshot.path.display(),
                error = %e,
                "Failed to restore previous install"
            );
        }
    }
}

async fn locate_executable(dir: &Path, record: &InstalledRecord) -> InstallResult<PathBuf> {
    let dir = dir.to_path_buf();
    let recorded = record.executable_rel_path.clone();
    blocking(move || {
        if let Some(marker) = InstallMarker::read(&dir) {
            if dir.join(&marker.executable).is_file() {
                return Ok(marker.executable);
            }
        }
        let hint = recorded.to_string_lossy().into_owned();
        resolve_executable(&dir, Some(&hint))?
            .ok_or_else(|| InstallError::extraction("no runnable executable found in backup"))
    })
    .await
}

async fn prune(evicted: Vec<BackupSnapshot>) {
    if evicted.is_empty() {
        return;
    }
    let paths: Vec<PathBuf> = evicted.into_iter().map(|s| s.path).collect();
    let pruned = tokio::task::spawn_blocking(move || {
        for path in &paths {
            tracing::debug!(target: "arcade.install", path = %path.display(), "Pruning backup");
            remove_dir_quietly(path);
        }
    })
    .await;
    if let Err(e) = pruned {
        tracing::warn!(target: "arcade.install", error = %e, "Backup pruning task failed");
    }
}
