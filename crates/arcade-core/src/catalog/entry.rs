//! Catalog entry, mirror and status types.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::size::parse_size;
use crate::version::is_newer;

/// Unique identifier of a catalog package.
///
/// Package ids double as directory names under the install root, so they
/// are kept as the manifest spells them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    /// Create a package id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PackageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for PackageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PackageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A single download source for a package archive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mirror {
    /// Human-readable mirror name ("Primary CDN", "Google Drive").
    pub name: String,
    /// Absolute URL of the archive.
    pub url: String,
    /// Declared content type (`zip`, `application/gzip`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Declared archive size in bytes, when the manifest states one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Whether this mirror is preferred over the others.
    #[serde(default)]
    pub is_primary: bool,
    /// Optional lowercase hex SHA-256 of the archive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl Mirror {
    /// Create a mirror with only a name and URL.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            content_type: None,
            size_bytes: None,
            is_primary: false,
            sha256: None,
        }
    }

    /// Mark this mirror as primary.
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }
}

/// Order mirrors for a logical operation: primaries first, then declaration order.
///
/// The sort is stable, so mirrors with equal priority keep manifest order.
pub fn prioritize_mirrors(mirrors: &[Mirror]) -> Vec<Mirror> {
    let mut ordered = mirrors.to_vec();
    ordered.sort_by_key(|mirror| !mirror.is_primary);
    ordered
}

/// Display status of a catalog entry.
///
/// Resolved by precedence: `ComingSoon` > `UpdateAvailable` > `Installed` > `Available`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Not installed locally.
    #[default]
    Available,
    /// Installed at the catalog version (or an unknown version).
    Installed,
    /// Installed at a version older than the catalog's.
    UpdateAvailable,
    /// Announced but not downloadable yet.
    ComingSoon,
}

impl EntryStatus {
    /// Resolve the status for an entry from what is known about the local install.
    ///
    /// `present` means an install directory with a runnable entry point was found.
    /// An install with an unknown version is never reported as outdated.
    #[must_use]
    pub fn resolve(
        coming_soon: bool,
        present: bool,
        installed_version: Option<&str>,
        catalog_version: &str,
    ) -> Self {
        if coming_soon {
            return Self::ComingSoon;
        }
        if !present {
            return Self::Available;
        }
        match installed_version {
            Some(installed) if is_newer(catalog_version, installed) => Self::UpdateAvailable,
            _ => Self::Installed,
        }
    }

    /// String form used in listings.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Installed => "installed",
            Self::UpdateAvailable => "update_available",
            Self::ComingSoon => "coming_soon",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A package as described by the manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Unique package id.
    pub id: PackageId,
    /// Display name.
    pub name: String,
    /// Current catalog version.
    pub version: String,
    /// Annotated status (computed by the scan reconciler).
    #[serde(default)]
    pub status: EntryStatus,
    /// Download sources in manifest declaration order.
    #[serde(default)]
    pub mirrors: Vec<Mirror>,
    /// Executable path relative to the install directory, if the manifest names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable_hint: Option<String>,
    /// Whether the repair operation is offered for this package.
    #[serde(default)]
    pub repair_enabled: bool,
    /// Whether the package is announced but not yet downloadable.
    #[serde(default)]
    pub is_coming_soon: bool,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Human-readable size ("1.2 GB").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<String>,
    /// Release date as written in the manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    /// Changelog for the current version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
    /// Cover image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Logo image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    /// Background artwork id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_id: Option<String>,
}

impl CatalogEntry {
    /// Create a minimal entry, mostly useful for tests and fixtures.
    pub fn new(id: impl Into<PackageId>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            status: EntryStatus::Available,
            mirrors: Vec::new(),
            executable_hint: None,
            repair_enabled: false,
            is_coming_soon: false,
            description: None,
            file_size: None,
            release_date: None,
            changelog: None,
            image_url: None,
            logo_url: None,
            background_id: None,
        }
    }

    /// Mirrors in the order they are attempted.
    pub fn ordered_mirrors(&self) -> Vec<Mirror> {
        prioritize_mirrors(&self.mirrors)
    }

    /// Best-known archive size: the largest declared mirror size, else `file_size`.
    pub fn declared_size(&self) -> Option<u64> {
        self.mirrors
            .iter()
            .filter_map(|m| m.size_bytes)
            .max()
            .or_else(|| self.file_size.as_deref().and_then(parse_size))
    }

    /// Whether the package can be downloaded at all.
    pub fn is_downloadable(&self) -> bool {
        !self.is_coming_soon && !self.mirrors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mirror(name: &str, primary: bool) -> Mirror {
        let m = Mirror::new(name, format!("https://{name}.example/archive.zip"));
        if primary { m.primary() } else { m }
    }

    #[test]
    fn test_primary_mirrors_come_first_in_declaration_order() {
        let mirrors = vec![
            mirror("a", false),
            mirror("b", true),
            mirror("c", false),
            mirror("d", true),
        ];

        let names: Vec<_> = prioritize_mirrors(&mirrors)
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, ["b", "d", "a", "c"]);
    }

    #[test]
    fn test_status_precedence() {
        assert_eq!(
            EntryStatus::resolve(true, true, Some("1.0.0"), "2.0.0"),
            EntryStatus::ComingSoon
        );
        assert_eq!(
            EntryStatus::resolve(false, true, Some("1.0.0"), "2.0.0"),
            EntryStatus::UpdateAvailable
        );
        assert_eq!(
            EntryStatus::resolve(false, true, Some("2.0.0"), "2.0.0"),
            EntryStatus::Installed
        );
        assert_eq!(
            EntryStatus::resolve(false, false, None, "2.0.0"),
            EntryStatus::Available
        );
    }

    #[test]
    fn test_unknown_installed_version_is_not_outdated() {
        assert_eq!(
            EntryStatus::resolve(false, true, None, "9.9.9"),
            EntryStatus::Installed
        );
    }

    #[test]
    fn test_declared_size_prefers_mirror_sizes() {
        let mut entry = CatalogEntry::new("stellar_quest", "Stellar Quest", "2.2.3");
        entry.file_size = Some("1 KB".to_string());
        assert_eq!(entry.declared_size(), Some(1024));

        let mut m = mirror("a", true);
        m.size_bytes = Some(5000);
        entry.mirrors.push(m);
        assert_eq!(entry.declared_size(), Some(5000));
    }

    #[test]
    fn test_package_id_borrows_as_str() {
        let mut map = std::collections::HashMap::new();
        map.insert(PackageId::from("stellar_quest"), 1);
        assert_eq!(map.get("stellar_quest"), Some(&1));
    }
}
