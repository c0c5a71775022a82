//! Download-then-publish for one catalog entry.
//!
//! [`PackageInstaller::acquire`] is the shared core of install, update and
//! repair: it reserves disk space, downloads through the mirror engine with
//! the session as progress reporter, and publishes the archive into a target
//! directory. Registry bookkeeping is left to the caller.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use arcade_core::{
    CatalogEntry, InstallError, InstallResult, InstalledRecord, InstalledStateRepositoryPort,
    ResolvedPaths,
};
use arcade_download::{MirrorDownloadEngine, SessionHandle};

use crate::disk::DiskBudget;
use crate::fsutil::remove_dir_quietly;
use crate::pipeline::{InstalledPaths, PublishRequest, StagingArea, publish_archive};

/// Default headroom for extraction, as a percentage of the archive size.
pub const DEFAULT_SPACE_PERCENT: u32 = 250;

/// Downloads and publishes packages.
pub struct PackageInstaller {
    engine: Arc<MirrorDownloadEngine>,
    registry: Arc<dyn InstalledStateRepositoryPort>,
    disk: DiskBudget,
    paths: ResolvedPaths,
    space_percent: u32,
}

impl PackageInstaller {
    /// Create an installer.
    pub fn new(
        engine: Arc<MirrorDownloadEngine>,
        registry: Arc<dyn InstalledStateRepositoryPort>,
        disk: DiskBudget,
        paths: ResolvedPaths,
    ) -> Self {
        Self {
            engine,
            registry,
            disk,
            paths,
            space_percent: DEFAULT_SPACE_PERCENT,
        }
    }

    /// Override the extraction headroom percentage.
    #[must_use]
    pub const fn with_space_percent(mut self, percent: u32) -> Self {
        self.space_percent = percent;
        self
    }

    /// Resolved launcher paths.
    pub const fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    /// Installed-state repository.
    pub fn registry(&self) -> &Arc<dyn InstalledStateRepositoryPort> {
        &self.registry
    }

    /// Bytes needed on the install volume for an archive of `size` bytes.
    pub fn required_space(&self, size: u64) -> u64 {
        size.saturating_mul(u64::from(self.space_percent)) / 100
    }

    /// Download `entry` and publish it into `target_dir`.
    ///
    /// On error `target_dir` is exactly as it was before the call and the
    /// staged archive is gone.
    pub async fn acquire(
        &self,
        entry: &CatalogEntry,
        target_dir: &Path,
        session: &SessionHandle,
    ) -> InstallResult<InstalledPaths> {
        if !entry.is_downloadable() {
            return Err(InstallError::NotDownloadable {
                package_id: entry.id.to_string(),
            });
        }

        let _reservation = match entry.declared_size() {
            Some(size) => Some(
                self.disk
                    .reserve(&self.paths.install_root, self.required_space(size))
                    .await?,
            ),
            None => None,
        };

        let staging = StagingArea::create(&self.paths.staging_dir, &entry.id)?;
        let outcome = self
            .engine
            .fetch(
                &entry.mirrors,
                &staging.archive_path(),
                session.cancel_token(),
                session,
            )
            .await?;

        tracing::info!(
            target: "arcade.install",
            package_id = %entry.id,
            mirror = %outcome.mirror.name,
            bytes = outcome.bytes,
            attempts = outcome.attempts(),
            "Archive downloaded"
        );

        session.extracting()?;

        let request = PublishRequest {
            package_id: entry.id.clone(),
            version: entry.version.clone(),
            target_dir: target_dir.to_path_buf(),
            executable_hint: entry.executable_hint.clone(),
            content_type: outcome.mirror.content_type.clone(),
            expected_bytes: Some(outcome.bytes),
            sha256: outcome.mirror.sha256.clone(),
        };
        publish_archive(&staging, request, session.cancel_token()).await
    }

    /// First install (or reinstall over an unregistered directory).
    ///
    /// Existing backups and the original install time survive a reinstall.
    pub async fn install(
        &self,
        entry: &CatalogEntry,
        session: &SessionHandle,
    ) -> InstallResult<(InstalledRecord, InstalledPaths)> {
        let existing = self.registry.get(&entry.id).await?;
        let target = existing.as_ref().map_or_else(
            || self.paths.package_dir(entry.id.as_str()),
            |r| r.install_dir.clone(),
        );

        let fresh = existing.is_none() && !target.exists();
        let installed = self.acquire(entry, &target, session).await?;
        let record = match existing {
            Some(mut record) => {
                record.installed_version.clone_from(&entry.version);
                record.install_dir.clone_from(&installed.install_dir);
                record.executable_rel_path.clone_from(&installed.executable_rel);
                record.updated_at = Utc::now();
                record
            }
            None => InstalledRecord::new(
                entry.id.clone(),
                entry.version.clone(),
                installed.install_dir.clone(),
                installed.executable_rel.clone(),
            ),
        };
        if let Err(e) = self.registry.upsert(&record).await {
            if fresh {
                tracing::warn!(target: "arcade.install", package_id = %entry.id, error = %e, "Registry write failed, removing new install");
                let dir = installed.install_dir.clone();
                if let Err(join) = tokio::task::spawn_blocking(move || remove_dir_quietly(&dir)).await {
                    tracing::warn!(target: "arcade.install", error = %join, "Cleanup task failed");
                }
            }
            return Err(e.into());
        }
        Ok((record, installed))
    }
}

impl std::fmt::Debug for PackageInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageInstaller")
            .field("install_root", &self.paths.install_root)
            .field("space_percent", &self.space_percent)
            .finish_non_exhaustive()
    }
}
