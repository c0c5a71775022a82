//! Resolved path layout for the launcher.
//!
//! This module provides a single struct that captures every path derived from
//! the data root and the install root, so all components agree on the layout
//! and the `arcade paths` command can print it.

use std::path::{Path, PathBuf};

use super::{PathError, data_root, resolve_install_root};

/// All resolved paths captured in a single struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Root directory for launcher data.
    pub data_root: PathBuf,
    /// Directory holding one subdirectory per installed package.
    pub install_root: PathBuf,
    /// Scratch area for downloads and extraction (same volume as installs).
    pub staging_dir: PathBuf,
    /// Retained backup snapshots, grouped by package id.
    pub backups_dir: PathBuf,
    /// Installed-state registry.
    pub registry_path: PathBuf,
    /// Last successfully fetched manifest.
    pub manifest_cache_path: PathBuf,
    /// Persisted launcher settings.
    pub settings_path: PathBuf,
}

impl ResolvedPaths {
    /// Resolve all paths using the current environment.
    ///
    /// `install_root` is the configured install root setting, if any.
    pub fn resolve(install_root: Option<&str>) -> Result<Self, PathError> {
        let data_root = data_root()?;
        let install_root = resolve_install_root(install_root)?;
        Ok(Self::from_roots(&data_root, &install_root))
    }

    /// Derive the layout from explicit roots without touching the environment.
    pub fn from_roots(data_root: &Path, install_root: &Path) -> Self {
        Self {
            data_root: data_root.to_path_buf(),
            install_root: install_root.to_path_buf(),
            staging_dir: install_root.join(".staging"),
            backups_dir: data_root.join("backups"),
            registry_path: data_root.join("installed.json"),
            manifest_cache_path: data_root.join("cache").join("manifest.json"),
            settings_path: data_root.join("settings.json"),
        }
    }

    /// Default live install directory for a package.
    pub fn package_dir(&self, package_id: &str) -> PathBuf {
        self.install_root.join(package_id)
    }
}

impl std::fmt::Display for ResolvedPaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "data_root = {}", self.data_root.display())?;
        writeln!(f, "install_root = {}", self.install_root.display())?;
        writeln!(f, "staging_dir = {}", self.staging_dir.display())?;
        writeln!(f, "backups_dir = {}", self.backups_dir.display())?;
        writeln!(f, "registry_path = {}", self.registry_path.display())?;
        writeln!(
            f,
            "manifest_cache_path = {}",
            self.manifest_cache_path.display()
        )?;
        write!(f, "settings_path = {}", self.settings_path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_lives_under_install_root() {
        let paths = ResolvedPaths::from_roots(Path::new("/data"), Path::new("/games"));
        assert_eq!(paths.staging_dir, PathBuf::from("/games/.staging"));
        assert_eq!(paths.registry_path, PathBuf::from("/data/installed.json"));
        assert_eq!(
            paths.package_dir("stellar_quest"),
            PathBuf::from("/games/stellar_quest")
        );
    }

    #[test]
    fn display_format_is_parseable() {
        let paths = ResolvedPaths::from_roots(Path::new("/data"), Path::new("/games"));
        let output = paths.to_string();

        for key in [
            "data_root = ",
            "install_root = ",
            "staging_dir = ",
            "backups_dir = ",
            "registry_path = ",
            "manifest_cache_path = ",
            "settings_path = ",
        ] {
            assert!(output.contains(key), "missing {key}");
        }
    }
}
