//! Archive format detection and extraction.
//!
//! Supports ZIP and gzip-compressed tar. Every entry path is sanitized so an
//! archive can never write outside the extraction directory; symlinks and
//! special files are skipped.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;

use arcade_core::{InstallError, InstallResult};

const ZIP_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
const ZIP_EMPTY_MAGIC: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// PKZIP.
    Zip,
    /// tar inside gzip.
    TarGz,
}

impl ArchiveFormat {
    /// Detect from the leading bytes, falling back to the declared content type.
    pub fn detect(path: &Path, content_type: Option<&str>) -> InstallResult<Self> {
        let mut head = [0u8; 4];
        let read = File::open(path)
            .and_then(|mut f| read_prefix(&mut f, &mut head))
            .map_err(|e| InstallError::io_context("reading archive header", &e))?;

        Self::from_magic(&head[..read])
            .or_else(|| content_type.and_then(Self::from_content_type))
            .ok_or_else(|| InstallError::extraction("unrecognized archive format"))
    }

    fn from_magic(head: &[u8]) -> Option<Self> {
        if head.starts_with(&ZIP_MAGIC) || head.starts_with(&ZIP_EMPTY_MAGIC) {
            Some(Self::Zip)
        } else if head.starts_with(&GZIP_MAGIC) {
            Some(Self::TarGz)
        } else {
            None
        }
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        let ct = content_type.to_ascii_lowercase();
        if ct.contains("zip") {
            Some(Self::Zip)
        } else if ct.contains("gzip") || ct.contains("tar") {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

fn read_prefix(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Resolve an archive entry name to a path relative to the extraction root.
///
/// Returns `Ok(None)` for entries that name the root itself.
pub fn sanitize_entry_path(name: &str) -> InstallResult<Option<PathBuf>> {
    let mut clean = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(InstallError::extraction(format!(
                    "entry escapes the install directory: {name}"
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(InstallError::extraction(format!(
                    "absolute entry paths are refused, archive must use relative paths: {name}"
                )));
            }
        }
    }
    Ok((!clean.as_os_str().is_empty()).then_some(clean))
}

/// Extract `archive` into `dest`. Returns the number of files written.
pub fn extract(archive: &Path, format: ArchiveFormat, dest: &Path) -> InstallResult<usize> {
    fs::create_dir_all(dest).map_err(|e| write_error("creating extraction directory", &e))?;
    let file = File::open(archive).map_err(|e| InstallError::io_context("opening archive", &e))?;
    match format {
        ArchiveFormat::Zip => extract_zip(file, dest),
        ArchiveFormat::TarGz => extract_tar_gz(file, dest),
    }
}

fn extract_zip(file: File, dest: &Path) -> InstallResult<usize> {
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| InstallError::extraction(format!("failed to read zip archive: {e}")))?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| InstallError::extraction(format!("failed to read zip entry: {e}")))?;
        let Some(rel) = sanitize_entry_path(entry.name())? else {
            continue;
        };
        let out_path = dest.join(&rel);
        let mode = entry.unix_mode();

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| write_error("creating directory", &e))?;
            continue;
        }
        if mode.is_some_and(is_symlink_mode) {
            tracing::debug!(target: "arcade.install", entry = %rel.display(), "Skipping symlink entry");
            continue;
        }

        write_entry(&mut entry, &out_path, mode)?;
        written += 1;
    }

    Ok(written)
}

fn extract_tar_gz(file: File, dest: &Path) -> InstallResult<usize> {
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let entries = archive
        .entries()
        .map_err(|e| InstallError::extraction(format!("failed to read tar archive: {e}")))?;
    let mut written = 0;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| InstallError::extraction(format!("failed to read tar entry: {e}")))?;
        let name = entry
            .path()
            .map_err(|e| InstallError::extraction(format!("invalid tar entry path: {e}")))?
            .to_string_lossy()
            .into_owned();
        let Some(rel) = sanitize_entry_path(&name)? else {
            continue;
        };
        let out_path = dest.join(&rel);

        match entry.header().entry_type() {
            tar::EntryType::Directory => {
                fs::create_dir_all(&out_path).map_err(|e| write_error("creating directory", &e))?;
            }
            tar::EntryType::Regular | tar::EntryType::Continuous => {
                let mode = entry.header().mode().ok();
                write_entry(&mut entry, &out_path, mode)?;
                written += 1;
            }
            other => {
                tracing::debug!(target: "arcade.install", entry = %rel.display(), kind = ?other, "Skipping special tar entry");
            }
        }
    }

    Ok(written)
}

fn write_entry(reader: &mut impl Read, out_path: &Path, mode: Option<u32>) -> InstallResult<()> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).map_err(|e| write_error("creating directory", &e))?;
    }
    let mut out = File::create(out_path).map_err(|e| write_error("creating file", &e))?;
    io::copy(reader, &mut out).map_err(|e| {
        if e.kind() == io::ErrorKind::StorageFull {
            write_error("writing file", &e)
        } else {
            InstallError::extraction(format!("corrupt entry {}: {e}", out_path.display()))
        }
    })?;
    apply_mode(out_path, mode)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> InstallResult<()> {
    use std::os::unix::fs::PermissionsExt;
    if let Some(mode) = mode.map(|m| m & 0o777).filter(|m| *m != 0) {
        // Owner must keep read/write so repair and updates can replace the file.
        let perms = fs::Permissions::from_mode(mode | 0o600);
        fs::set_permissions(path, perms).map_err(|e| write_error("setting permissions", &e))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> InstallResult<()> {
    Ok(())
}

const fn is_symlink_mode(mode: u32) -> bool {
    mode & 0o170_000 == 0o120_000
}

fn write_error(context: &str, err: &io::Error) -> InstallError {
    if err.kind() == io::ErrorKind::StorageFull {
        return InstallError::DiskSpace {
            required: 0,
            available: 0,
        };
    }
    InstallError::io_context(context, err)
}
