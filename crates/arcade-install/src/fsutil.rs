//! Directory moves and cleanup shared by the pipeline, backups and repair.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use arcade_core::{InstallError, InstallResult};

/// Move `from` to `to`, falling back to copy-and-delete across volumes.
pub fn move_dir(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(from, to),
        Err(e) => Err(e),
    }
}

/// Copy `from` to `to` and delete `from`. A failed copy removes the partial
/// destination and leaves `from` untouched.
fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    if let Err(e) = copy_dir(from, to) {
        remove_dir_quietly(to);
        return Err(e);
    }
    fs::remove_dir_all(from)
}

fn copy_dir(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
        } else if file_type.is_symlink() {
            copy_symlink(&entry.path(), &target)?;
        } else {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("cannot copy special file {}", entry.path().display()),
            ));
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(from)?, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, _to: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot copy symlink {}", from.display()),
    ))
}

/// Remove a directory tree, logging instead of failing.
pub fn remove_dir_quietly(path: &Path) {
    match fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(target: "arcade.install", path = %path.display(), error = %e, "Failed to remove directory");
        }
    }
}

/// Whether `path` is a directory with at least one entry.
pub fn is_non_empty_dir(path: &Path) -> bool {
    fs::read_dir(path).is_ok_and(|mut entries| entries.next().is_some())
}

/// Relative paths of every regular file under `root`, sorted.
pub fn list_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                stack.push(entry.path());
            } else if file_type.is_file() {
                if let Ok(rel) = entry.path().strip_prefix(root) {
                    files.push(rel.to_path_buf());
                }
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Run blocking filesystem work on the blocking pool.
pub async fn blocking<T, F>(f: F) -> InstallResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> InstallResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| InstallError::other(format!("blocking task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_dir_renames_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let from = tmp.path().join("a");
        fs::create_dir_all(from.join("sub")).unwrap();
        fs::write(from.join("sub/file.txt"), b"hi").unwrap();

        let to = tmp.path().join("nested/b");
        move_dir(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(to.join("sub/file.txt")).unwrap(), b"hi");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_keeps_symlinks() {
        let tmp = tempfile::tempdir().unwrap();
        let from = tmp.path().join("a");
        fs::create_dir_all(from.join("lib")).unwrap();
        fs::write(from.join("lib/libgame.so.1"), b"elf").unwrap();
        std::os::unix::fs::symlink("libgame.so.1", from.join("lib/libgame.so")).unwrap();

        let to = tmp.path().join("b");
        copy_then_remove(&from, &to).unwrap();

        assert!(!from.exists());
        let link = to.join("lib/libgame.so");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("libgame.so.1"));
        assert_eq!(fs::read(&link).unwrap(), b"elf");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_copy_removes_partial_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let from = tmp.path().join("a");
        fs::create_dir_all(from.join("data")).unwrap();
        fs::write(from.join("data/level1.dat"), b"level").unwrap();
        let _socket = std::os::unix::net::UnixListener::bind(from.join("game.sock")).unwrap();

        let to = tmp.path().join("b");
        let err = copy_then_remove(&from, &to).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert!(!to.exists());
        assert_eq!(fs::read(from.join("data/level1.dat")).unwrap(), b"level");
    }

    #[test]
    fn test_list_files_is_relative_and_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("bin")).unwrap();
        fs::write(tmp.path().join("bin/game"), b"").unwrap();
        fs::write(tmp.path().join("README"), b"").unwrap();

        let files = list_files(tmp.path()).unwrap();
        assert_eq!(files, vec![PathBuf::from("README"), PathBuf::from("bin/game")]);
    }

    #[test]
    fn test_non_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!is_non_empty_dir(tmp.path()));
        fs::write(tmp.path().join("x"), b"").unwrap();
        assert!(is_non_empty_dir(tmp.path()));
        assert!(!is_non_empty_dir(&tmp.path().join("missing")));
    }
}
