//! Runnable entry point discovery.
//!
//! The manifest hint wins when it names a file that exists. Otherwise every
//! candidate under the install directory is scored and the lowest score
//! wins: shallow files are preferred, uninstallers, installers and
//! launchers are pushed down, and names mentioning the game are pulled up.
//! On Unix, files recognized by extension or header always outrank files
//! that only carry an exec bit.

use std::io::Read;
use std::path::{Path, PathBuf};

use arcade_core::{InstallError, InstallResult};

use crate::archive::sanitize_entry_path;
use crate::marker::MARKER_FILE;

const SCRIPT_EXTENSIONS: &[&str] = &["sh", "x86_64", "appimage"];
const LIBRARY_EXTENSIONS: &[&str] = &["so", "dylib", "dll"];

/// ELF, Mach-O (both widths, both byte orders) and universal binaries.
const NATIVE_MAGIC: &[[u8; 4]] = &[
    *b"\x7fELF",
    [0xfe, 0xed, 0xfa, 0xce],
    [0xfe, 0xed, 0xfa, 0xcf],
    [0xce, 0xfa, 0xed, 0xfe],
    [0xcf, 0xfa, 0xed, 0xfe],
    [0xca, 0xfe, 0xba, 0xbe],
    [0xbe, 0xba, 0xfe, 0xca],
];

/// How sure we are that a file is runnable. Earlier variants rank first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Evidence {
    /// Known executable extension, native binary header or shebang.
    Recognized,
    /// Nothing but the exec bit.
    ExecBitOnly,
}

/// Find the executable under `root`, returning its path relative to `root`.
pub fn resolve_executable(root: &Path, hint: Option<&str>) -> InstallResult<Option<PathBuf>> {
    let files = crate::fsutil::list_files(root)
        .map_err(|e| InstallError::io_context("scanning install directory", &e))?;

    if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
        if let Some(found) = match_hint(root, &files, hint) {
            return Ok(Some(found));
        }
        tracing::warn!(target: "arcade.install", hint, "Executable hint not found, using heuristic");
    }

    let mut candidates: Vec<(Evidence, i32, &PathBuf)> = files
        .iter()
        .filter_map(|rel| evidence(&root.join(rel)).map(|ev| (ev, executable_score(rel), rel)))
        .collect();
    candidates.sort();

    Ok(candidates.first().map(|(_, _, rel)| (*rel).clone()))
}

fn match_hint(root: &Path, files: &[PathBuf], hint: &str) -> Option<PathBuf> {
    let normalized = hint.replace('\\', "/");
    if let Ok(Some(rel)) = sanitize_entry_path(&normalized) {
        if root.join(&rel).is_file() {
            return Some(rel);
        }
    }

    // The hint may only name the file, or the archive may have been flattened.
    let wanted = Path::new(&normalized).file_name()?.to_string_lossy().to_lowercase();
    files
        .iter()
        .filter(|rel| {
            rel.file_name()
                .is_some_and(|n| n.to_string_lossy().to_lowercase() == wanted)
        })
        .min_by_key(|rel| rel.components().count())
        .cloned()
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

fn evidence(path: &Path) -> Option<Evidence> {
    if path.file_name().is_some_and(|n| n == MARKER_FILE) {
        return None;
    }
    let ext = extension(path);
    if ext.as_deref() == Some("exe") {
        return Some(Evidence::Recognized);
    }
    if !cfg!(unix) {
        return None;
    }
    if ext
        .as_deref()
        .is_some_and(|e| LIBRARY_EXTENSIONS.contains(&e))
        || path.to_string_lossy().contains(".so.")
    {
        return None;
    }
    if ext.as_deref().is_some_and(|e| SCRIPT_EXTENSIONS.contains(&e)) || has_runnable_header(path) {
        return Some(Evidence::Recognized);
    }
    has_exec_bit(path).then_some(Evidence::ExecBitOnly)
}

fn has_runnable_header(path: &Path) -> bool {
    let mut head = [0u8; 4];
    let read = std::fs::File::open(path).and_then(|mut f| f.read_exact(&mut head));
    read.is_ok() && (head.starts_with(b"#!") || NATIVE_MAGIC.contains(&head))
}

#[cfg(unix)]
fn has_exec_bit(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).is_ok_and(|m| m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn has_exec_bit(_path: &Path) -> bool {
    false
}

/// Lower is better.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn executable_score(rel: &Path) -> i32 {
    let depth = rel.components().count() as i32;
    let name = rel
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let mut score = depth * 10;
    if name.contains("unins") || name.contains("uninstall") {
        score += 1_000;
    }
    if name.contains("setup") || name.contains("install") {
        score += 500;
    }
    if name.contains("launcher") {
        score += 200;
    }
    if name.contains("game") || name.contains("play") {
        score -= 50;
    }
    score
}
