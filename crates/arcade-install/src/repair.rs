//! Install validation and reinstall-on-failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use arcade_core::{InstallError, InstallResult, InstalledRecord, PackageId};
use arcade_download::SessionHandle;

use crate::fsutil::{blocking, is_non_empty_dir, list_files, move_dir, remove_dir_quietly};
use crate::installer::PackageInstaller;
use crate::marker::{InstallMarker, MARKER_FILE};
use crate::store::CatalogStore;

/// Outcome of a repair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    /// Files written by the reinstall, relative to the install directory.
    pub repaired_files: Vec<PathBuf>,
    /// Problems that prevented the repair.
    pub errors: Vec<String>,
    /// Whether the install is valid afterwards.
    pub success: bool,
}

impl RepairReport {
    /// Report for an install that needed nothing.
    pub const fn healthy() -> Self {
        Self {
            repaired_files: Vec::new(),
            errors: Vec::new(),
            success: true,
        }
    }

    /// Report for a repair that failed with `error`.
    pub fn failed(error: &InstallError) -> Self {
        let errors = match error.mirror_failures() {
            [] => vec![error.user_message()],
            failures => failures
                .iter()
                .map(|f| format!("{}: {}", f.mirror, f.reason))
                .collect(),
        };
        Self {
            repaired_files: Vec::new(),
            errors,
            success: false,
        }
    }
}

/// Check that a live install is usable.
///
/// Fails with `RepairValidation` listing every problem found.
pub fn validate_install(record: &InstalledRecord) -> InstallResult<()> {
    let dir = &record.install_dir;
    let mut problems = Vec::new();

    if !dir.is_dir() {
        problems.push(format!("install directory {} is missing", dir.display()));
    } else if !is_non_empty_dir(dir) {
        problems.push(format!("install directory {} is empty", dir.display()));
    } else {
        if !record.executable_path().is_file() {
            problems.push(format!(
                "executable {} is missing",
                record.executable_rel_path.display()
            ));
        }
        if let Some(marker) = InstallMarker::read(dir) {
            if marker.package_id != record.package_id {
                problems.push(format!(
                    "install marker names {} instead of {}",
                    marker.package_id, record.package_id
                ));
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(InstallError::repair_validation(problems.join("; ")))
    }
}

/// Validates installs and reinstalls broken ones.
pub struct RepairEngine {
    installer: Arc<PackageInstaller>,
    catalog: Arc<CatalogStore>,
}

impl RepairEngine {
    /// Create an engine.
    pub const fn new(installer: Arc<PackageInstaller>, catalog: Arc<CatalogStore>) -> Self {
        Self { installer, catalog }
    }

    /// Check that repair is offered and the package is installed.
    pub async fn preflight(&self, package_id: &PackageId) -> InstallResult<InstalledRecord> {
        let entry = self.catalog.require(package_id)?;
        if !entry.repair_enabled {
            return Err(InstallError::RepairDisabled {
                package_id: package_id.to_string(),
            });
        }
        self.installer
            .registry()
            .get(package_id)
            .await?
            .ok_or_else(|| InstallError::not_installed(package_id))
    }

    /// Validate the live install and reinstall it if it is broken.
    ///
    /// A healthy install is left alone. A broken one is moved to quarantine,
    /// reinstalled from the current mirrors, and the quarantine deleted; if
    /// the reinstall fails the quarantined directory is put back.
    pub async fn repair(&self, session: &SessionHandle) -> InstallResult<RepairReport> {
        let package_id = session.package_id();
        let mut record = self.preflight(package_id).await?;

        let check = record.clone();
        let reason = match blocking(move || validate_install(&check)).await {
            Ok(()) => {
                tracing::info!(target: "arcade.install", package_id = %package_id, "Install is healthy, nothing to repair");
                return Ok(RepairReport::healthy());
            }
            Err(InstallError::RepairValidation { reason }) => reason,
            Err(e) => return Err(e),
        };
        tracing::warn!(target: "arcade.install", package_id = %package_id, %reason, "Install failed validation, reinstalling");

        let entry = self.catalog.require(package_id)?;
        let quarantine = self.quarantine(&record).await?;

        let installed = match self.installer.acquire(&entry, &record.install_dir, session).await {
            Ok(installed) => installed,
            Err(e) => {
                if let Some(q) = &quarantine {
                    unquarantine(q, &record.install_dir).await;
                }
                return Err(e);
            }
        };

        record.installed_version.clone_from(&entry.version);
        record.executable_rel_path.clone_from(&installed.executable_rel);
        record.updated_at = Utc::now();
        if let Err(e) = self.installer.registry().upsert(&record).await {
            tracing::warn!(target: "arcade.install", package_id = %package_id, error = %e, "Registry write failed, restoring quarantined install");
            if let Some(q) = &quarantine {
                unquarantine(q, &record.install_dir).await;
            }
            return Err(e.into());
        }

        let dir = installed.install_dir.clone();
        let repaired_files = blocking(move || {
            list_files(&dir)
                .map(|files| files.into_iter().filter(|f| f != Path::new(MARKER_FILE)).collect())
                .map_err(|e| InstallError::io_context("listing repaired files", &e))
        })
        .await?;

        if let Some(q) = quarantine {
            if let Err(e) = tokio::task::spawn_blocking(move || remove_dir_quietly(&q)).await {
                tracing::warn!(target: "arcade.install", error = %e, "Quarantine cleanup task failed");
            }
        }

        Ok(RepairReport {
            repaired_files,
            errors: Vec::new(),
            success: true,
        })
    }

    async fn quarantine(&self, record: &InstalledRecord) -> InstallResult<Option<PathBuf>> {
        if !record.install_dir.exists() {
            return Ok(None);
        }
        let to = self.installer.paths().staging_dir.join(format!(
            "{}-quarantine-{}",
            record.package_id,
            Uuid::new_v4().simple()
        ));
        let from = record.install_dir.clone();
        let dest = to.clone();
        blocking(move || {
            move_dir(&from, &dest)
                .map_err(|e| InstallError::io_context("quarantining broken install", &e))
        })
        .await?;
        Ok(Some(to))
    }
}

impl std::fmt::Debug for RepairEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepairEngine").finish_non_exhaustive()
    }
}

async fn unquarantine(quarantine: &Path, install_dir: &Path) {
    let from = quarantine.to_path_buf();
    let to = install_dir.to_path_buf();
    let restored = blocking(move || {
        remove_dir_quietly(&to);
        move_dir(&from, &to).map_err(|e| InstallError::io_context("restoring quarantined install", &e))
    })
    .await;
    if let Err(e) = restored {
        tracing::error!(
            target: "arcade.install",
            quarantine = %quarantine.display(),
            error = %e,
            "Failed to restore quarantined install"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn record(dir: &Path) -> InstalledRecord {
        InstalledRecord::new(
            PackageId::from("stellar_quest"),
            "2.2.3",
            dir.to_path_buf(),
            PathBuf::from("StellarQuest.exe"),
        )
    }

    #[test]
    fn test_valid_install_passes() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("StellarQuest.exe"), b"MZ").unwrap();
        InstallMarker::new(PackageId::from("stellar_quest"), "2.2.3", "StellarQuest.exe".into())
            .write(tmp.path())
            .unwrap();
        assert!(validate_install(&record(tmp.path())).is_ok());
    }

    #[test]
    fn test_missing_executable_fails() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("data.pak"), b"1").unwrap();
        let err = validate_install(&record(tmp.path())).unwrap_err();
        assert!(matches!(err, InstallError::RepairValidation { reason } if reason.contains("StellarQuest.exe")));
    }

    #[test]
    fn test_missing_and_empty_directories_fail() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(validate_install(&record(&tmp.path().join("gone"))).is_err());
        assert!(validate_install(&record(tmp.path())).is_err());
    }

    #[test]
    fn test_foreign_marker_fails() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("StellarQuest.exe"), b"MZ").unwrap();
        InstallMarker::new(PackageId::from("nebula_drift"), "1.0", "StellarQuest.exe".into())
            .write(tmp.path())
            .unwrap();
        let err = validate_install(&record(tmp.path())).unwrap_err();
        assert!(matches!(err, InstallError::RepairValidation { reason } if reason.contains("nebula_drift")));
    }

    #[test]
    fn test_failed_report_lists_each_mirror() {
        let err = InstallError::AllMirrorsExhausted {
            failures: vec![
                arcade_core::MirrorFailure::new("Primary", "https://p", "HTTP 503"),
                arcade_core::MirrorFailure::new("Secondary", "https://s", "HTTP 502"),
            ],
        };
        let report = RepairReport::failed(&err);
        assert!(!report.success);
        assert_eq!(report.errors, ["Primary: HTTP 503", "Secondary: HTTP 502"]);
    }
}
