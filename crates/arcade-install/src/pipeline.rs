//! Install/extract pipeline.
//!
//! A downloaded archive is verified, extracted into a scratch directory inside
//! its staging area, given an entry point and an install marker, and only then
//! moved into place. Until the final rename nothing outside the staging area
//! is touched, and dropping the staging area discards everything it holds.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use arcade_core::{InstallError, InstallResult, PackageId};

use crate::archive::{self, ArchiveFormat};
use crate::executable::resolve_executable;
use crate::fsutil::{blocking, move_dir, remove_dir_quietly};
use crate::marker::InstallMarker;

const ARCHIVE_FILE: &str = "archive.download";
const SCRATCH_DIR: &str = "content";
const DISPLACED_DIR: &str = "displaced";

/// Per-operation scratch space under the install root's staging directory.
///
/// The directory is removed when the area is dropped.
#[derive(Debug)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Create a fresh area for `package_id` under `staging_dir`.
    pub fn create(staging_dir: &Path, package_id: &PackageId) -> InstallResult<Self> {
        let root = staging_dir.join(format!("{package_id}-{}", Uuid::new_v4().simple()));
        fs::create_dir_all(&root).map_err(|e| InstallError::io_context("creating staging area", &e))?;
        Ok(Self { root })
    }

    /// Root of the area.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the downloaded archive is written.
    pub fn archive_path(&self) -> PathBuf {
        self.root.join(ARCHIVE_FILE)
    }

    /// Where the archive is extracted.
    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join(SCRATCH_DIR)
    }

    fn displaced_dir(&self) -> PathBuf {
        self.root.join(DISPLACED_DIR)
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        remove_dir_quietly(&self.root);
    }
}

/// What to publish and where.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Package being installed.
    pub package_id: PackageId,
    /// Version the archive contains.
    pub version: String,
    /// Live install directory to create or replace.
    pub target_dir: PathBuf,
    /// Manifest executable hint.
    pub executable_hint: Option<String>,
    /// Content type announced for the archive.
    pub content_type: Option<String>,
    /// Bytes the download engine reported writing.
    pub expected_bytes: Option<u64>,
    /// Optional lowercase or uppercase hex SHA-256 of the archive.
    pub sha256: Option<String>,
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPaths {
    /// Live install directory.
    pub install_dir: PathBuf,
    /// Executable relative to `install_dir`.
    pub executable_rel: PathBuf,
    /// Absolute executable path.
    pub executable_path: PathBuf,
    /// Number of files extracted.
    pub files: usize,
}

/// Verify, extract and publish the archive held in `staging`.
///
/// On error the live directory is exactly as it was before the call.
pub async fn publish_archive(
    staging: &StagingArea,
    request: PublishRequest,
    cancel: &CancellationToken,
) -> InstallResult<InstalledPaths> {
    let archive = staging.archive_path();
    let scratch = staging.scratch_dir();
    let displaced = staging.displaced_dir();
    let cancel = cancel.clone();

    blocking(move || publish_blocking(&archive, &scratch, &displaced, &request, &cancel)).await
}

fn publish_blocking(
    archive_path: &Path,
    scratch: &Path,
    displaced: &Path,
    request: &PublishRequest,
    cancel: &CancellationToken,
) -> InstallResult<InstalledPaths> {
    verify_archive(archive_path, request)?;
    let format = ArchiveFormat::detect(archive_path, request.content_type.as_deref())?;

    if cancel.is_cancelled() {
        return Err(InstallError::Cancelled);
    }

    let files = archive::extract(archive_path, format, scratch)?;
    if files == 0 {
        return Err(InstallError::extraction("archive contains no files"));
    }
    let content_root = flatten_root(scratch)
        .map_err(|e| InstallError::io_context("inspecting extracted files", &e))?;

    let executable_rel = resolve_executable(&content_root, request.executable_hint.as_deref())?
        .ok_or_else(|| InstallError::extraction("no runnable executable found in archive"))?;

    InstallMarker::new(
        request.package_id.clone(),
        request.version.clone(),
        executable_rel.clone(),
    )
    .write(&content_root)?;

    if cancel.is_cancelled() {
        return Err(InstallError::Cancelled);
    }

    swap_into_place(&content_root, &request.target_dir, displaced)?;

    tracing::info!(
        target: "arcade.install",
        package_id = %request.package_id,
        version = %request.version,
        dir = %request.target_dir.display(),
        executable = %executable_rel.display(),
        files,
        "Published install"
    );

    Ok(InstalledPaths {
        executable_path: request.target_dir.join(&executable_rel),
        install_dir: request.target_dir.clone(),
        executable_rel,
        files,
    })
}

fn verify_archive(path: &Path, request: &PublishRequest) -> InstallResult<()> {
    let len = fs::metadata(path)
        .map_err(|e| InstallError::io_context("reading downloaded archive", &e))?
        .len();
    if len == 0 {
        return Err(InstallError::extraction("downloaded archive is empty"));
    }
    if let Some(expected) = request.expected_bytes {
        if expected != len {
            return Err(InstallError::extraction(format!(
                "archive size mismatch: expected {expected} bytes, found {len}"
            )));
        }
    }

    if let Some(expected) = request.sha256.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let actual = sha256_hex(path)
            .map_err(|e| InstallError::io_context("hashing downloaded archive", &e))?;
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(InstallError::extraction(format!(
                "checksum mismatch: expected {expected}, got {actual}"
            )));
        }
        tracing::debug!(target: "arcade.install", package_id = %request.package_id, "Checksum verified");
    }
    Ok(())
}

/// Hex SHA-256 of a file.
pub fn sha256_hex(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut file = File::open(path)?;
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Descend into a lone top-level directory wrapping the whole archive.
fn flatten_root(scratch: &Path) -> io::Result<PathBuf> {
    let mut entries = fs::read_dir(scratch)?.collect::<Result<Vec<_>, _>>()?;
    if entries.len() == 1 && entries[0].file_type()?.is_dir() {
        if let Some(only) = entries.pop() {
            return Ok(only.path());
        }
    }
    Ok(scratch.to_path_buf())
}

/// Replace `target` with `content`, restoring the previous directory if the
/// final move fails.
fn swap_into_place(content: &Path, target: &Path, displaced: &Path) -> InstallResult<()> {
    let had_previous = target.exists();
    if had_previous {
        move_dir(target, displaced)
            .map_err(|e| InstallError::io_context("moving previous install aside", &e))?;
    }

    if let Err(e) = move_dir(content, target) {
        remove_dir_quietly(target);
        if had_previous {
            if let Err(restore) = move_dir(displaced, target) {
                tracing::error!(
                    target: "arcade.install",
                    dir = %target.display(),
                    error = %restore,
                    "Failed to restore previous install"
                );
            }
        }
        return Err(InstallError::io_context("publishing install directory", &e));
    }
    Ok(())
}
