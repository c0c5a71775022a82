//! Platform-specific path resolution.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::PathError;

/// Environment variable overriding the data root.
pub(super) const DATA_DIR_ENV: &str = "ARCADE_DATA_DIR";

/// Environment variable overriding the install root.
pub(super) const GAMES_DIR_ENV: &str = "ARCADE_GAMES_DIR";

/// Get the root directory for launcher data (registry, settings, cache, backups).
///
/// Resolution order:
/// 1. `ARCADE_DATA_DIR` environment variable (highest priority)
/// 2. System data directory (e.g., `~/.local/share/arcade`)
pub fn data_root() -> Result<PathBuf, PathError> {
    if let Ok(path) = env::var(DATA_DIR_ENV) {
        let root = normalize_user_path(&path)?;
        ensure_directory(&root)?;
        return Ok(root);
    }

    let data_dir = dirs::data_local_dir().ok_or(PathError::NoDataDir)?;
    let root = data_dir.join("arcade");
    ensure_directory(&root)?;
    Ok(root)
}

/// Resolve the install root.
///
/// Resolution order:
/// 1. `ARCADE_GAMES_DIR` environment variable
/// 2. `configured` (the `install_root` setting), when present
/// 3. `<data_root>/games`
pub fn resolve_install_root(configured: Option<&str>) -> Result<PathBuf, PathError> {
    if let Ok(path) = env::var(GAMES_DIR_ENV) {
        return normalize_user_path(&path);
    }
    if let Some(raw) = configured {
        return normalize_user_path(raw);
    }
    Ok(data_root()?.join("games"))
}

/// Create `path` (and parents) if missing, failing if it exists as a file.
pub fn ensure_directory(path: &Path) -> Result<(), PathError> {
    if path.exists() {
        if path.is_dir() {
            return Ok(());
        }
        return Err(PathError::NotADirectory(path.to_path_buf()));
    }

    fs::create_dir_all(path).map_err(|e| PathError::CreateFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    tracing::debug!(path = %path.display(), "Created directory");
    Ok(())
}

/// Normalize a user-provided path, expanding `~` and making it absolute.
pub(super) fn normalize_user_path(raw: &str) -> Result<PathBuf, PathError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PathError::EmptyPath);
    }

    let expanded = if trimmed.starts_with("~/") || trimmed == "~" {
        let home = dirs::home_dir().ok_or(PathError::NoHomeDir)?;
        if trimmed == "~" {
            home
        } else {
            home.join(trimmed.trim_start_matches("~/"))
        }
    } else {
        PathBuf::from(trimmed)
    };

    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(expanded))
            .map_err(|e| PathError::CurrentDirError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(matches!(normalize_user_path("  "), Err(PathError::EmptyPath)));
    }

    #[test]
    fn test_normalize_makes_relative_absolute() {
        let path = normalize_user_path("games").unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("games"));
    }

    #[test]
    fn test_ensure_directory_creates_and_rejects_files() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b");
        ensure_directory(&nested).unwrap();
        assert!(nested.is_dir());

        let file = tmp.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            ensure_directory(&file),
            Err(PathError::NotADirectory(_))
        ));
    }
}
