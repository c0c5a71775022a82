//! Installed package records and backup snapshots.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::PackageId;

/// Maximum number of backup snapshots retained per package.
pub const MAX_BACKUPS: usize = 3;

/// A snapshot of a previous install, kept so an update can be rolled back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    /// Version that was live when the snapshot was taken.
    pub version: String,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
    /// Directory holding the snapshot.
    pub path: PathBuf,
}

/// Persisted state of one installed package.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledRecord {
    /// Package id (matches the catalog).
    pub package_id: PackageId,
    /// Version currently live.
    pub installed_version: String,
    /// Live install directory.
    pub install_dir: PathBuf,
    /// Executable path relative to `install_dir`.
    pub executable_rel_path: PathBuf,
    /// Retained snapshots, oldest first.
    #[serde(default)]
    pub backups: Vec<BackupSnapshot>,
    /// First successful install.
    pub installed_at: DateTime<Utc>,
    /// Last time the live version changed.
    pub updated_at: DateTime<Utc>,
}

impl InstalledRecord {
    /// Create a record for a fresh install.
    pub fn new(
        package_id: PackageId,
        installed_version: impl Into<String>,
        install_dir: PathBuf,
        executable_rel_path: PathBuf,
    ) -> Self {
        let now = Utc::now();
        Self {
            package_id,
            installed_version: installed_version.into(),
            install_dir,
            executable_rel_path,
            backups: Vec::new(),
            installed_at: now,
            updated_at: now,
        }
    }

    /// Absolute path of the executable.
    pub fn executable_path(&self) -> PathBuf {
        self.install_dir.join(&self.executable_rel_path)
    }

    /// Whether the install directory and executable still exist on disk.
    pub fn is_present(&self) -> bool {
        self.install_dir.is_dir() && self.executable_path().is_file()
    }

    /// Record a new backup, evicting the oldest snapshots beyond [`MAX_BACKUPS`].
    ///
    /// Returns the evicted snapshots so the caller can delete them from disk.
    pub fn push_backup(&mut self, snapshot: BackupSnapshot) -> Vec<BackupSnapshot> {
        self.backups.push(snapshot);
        self.backups.sort_by_key(|b| b.created_at);

        let excess = self.backups.len().saturating_sub(MAX_BACKUPS);
        self.backups.drain(..excess).collect()
    }

    /// Remove and return the snapshot for `version`, newest first if several exist.
    pub fn take_backup(&mut self, version: &str) -> Option<BackupSnapshot> {
        let index = self
            .backups
            .iter()
            .rposition(|b| b.version == version)?;
        Some(self.backups.remove(index))
    }
}
