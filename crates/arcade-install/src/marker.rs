//! Install marker written into every published install directory.
//!
//! The marker lets a directory identify its package without the registry,
//! which the scan reconciler and repair validation rely on.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use arcade_core::{InstallError, InstallResult, PackageId};

/// File name of the marker inside an install directory.
pub const MARKER_FILE: &str = ".arcade-install.json";

/// Contents of the install marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallMarker {
    /// Package id.
    pub package_id: PackageId,
    /// Installed version.
    pub version: String,
    /// Executable relative to the install directory.
    pub executable: PathBuf,
    /// When the directory was published.
    pub installed_at: DateTime<Utc>,
}

impl InstallMarker {
    /// Marker for a fresh install.
    pub fn new(package_id: PackageId, version: impl Into<String>, executable: PathBuf) -> Self {
        Self {
            package_id,
            version: version.into(),
            executable,
            installed_at: Utc::now(),
        }
    }

    /// Write the marker into `dir`.
    pub fn write(&self, dir: &Path) -> InstallResult<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| InstallError::other(format!("failed to encode install marker: {e}")))?;
        fs::write(dir.join(MARKER_FILE), json)
            .map_err(|e| InstallError::io_context("writing install marker", &e))
    }

    /// Read the marker from `dir`. Missing or unreadable markers yield `None`.
    pub fn read(dir: &Path) -> Option<Self> {
        let raw = fs::read(dir.join(MARKER_FILE)).ok()?;
        match serde_json::from_slice(&raw) {
            Ok(marker) => Some(marker),
            Err(e) => {
                tracing::debug!(target: "arcade.install", dir = %dir.display(), error = %e, "Ignoring unreadable install marker");
                None
            }
        }
    }
}
