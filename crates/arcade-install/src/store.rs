//! Owned catalog state shared by the launcher's components.
//!
//! Readers always get a cloned snapshot; the only mutations are replacing the
//! whole catalog after a manifest fetch and annotating entry status.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use arcade_core::{
    CatalogEntry, CatalogSnapshot, CatalogSource, EntryStatus, InstallError, InstallResult,
    PackageId,
};

/// Current catalog plus provenance.
#[derive(Debug, Default)]
pub struct CatalogStore {
    inner: RwLock<Option<CatalogSnapshot>>,
}

impl CatalogStore {
    /// Empty store; lookups fail until a catalog is loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `snapshot`.
    pub fn with_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self {
            inner: RwLock::new(Some(snapshot)),
        }
    }

    /// Replace the catalog, carrying statuses over to entries whose id and
    /// version are unchanged.
    ///
    /// Entries whose version moved start from `Available` and need to be
    /// re-resolved against the installed records.
    pub fn replace(&self, mut snapshot: CatalogSnapshot) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let known: HashMap<&PackageId, (&str, EntryStatus)> = guard
            .as_ref()
            .map(|previous| {
                previous
                    .entries
                    .iter()
                    .map(|e| (&e.id, (e.version.as_str(), e.status)))
                    .collect()
            })
            .unwrap_or_default();
        for entry in &mut snapshot.entries {
            entry.status = if entry.is_coming_soon {
                EntryStatus::ComingSoon
            } else {
                match known.get(&entry.id) {
                    Some((version, status)) if *version == entry.version => *status,
                    _ => EntryStatus::Available,
                }
            };
        }
        *guard = Some(snapshot);
    }

    /// Whether a catalog has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Where the current catalog came from.
    pub fn source(&self) -> Option<CatalogSource> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.source)
    }

    /// Copy of the current snapshot.
    pub fn snapshot(&self) -> Option<CatalogSnapshot> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries in manifest order.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.entries.clone())
            .unwrap_or_default()
    }

    /// Look up one entry.
    pub fn entry(&self, package_id: &PackageId) -> Option<CatalogEntry> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|s| s.entries.iter().find(|e| &e.id == package_id).cloned())
    }

    /// Look up one entry, failing with `UnknownPackage`.
    pub fn require(&self, package_id: &PackageId) -> InstallResult<CatalogEntry> {
        self.entry(package_id)
            .ok_or_else(|| InstallError::unknown_package(package_id))
    }

    /// Set the status of one entry. Unknown ids are ignored.
    pub fn set_status(&self, package_id: &PackageId, status: EntryStatus) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = guard
            .as_mut()
            .and_then(|s| s.entries.iter_mut().find(|e| &e.id == package_id))
        {
            entry.status = status;
        }
    }

    /// Copy statuses from annotated entries onto the stored catalog.
    pub fn annotate(&self, annotated: &[CatalogEntry]) {
        let statuses: HashMap<&PackageId, EntryStatus> =
            annotated.iter().map(|e| (&e.id, e.status)).collect();
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(snapshot) = guard.as_mut() {
            for entry in &mut snapshot.entries {
                if let Some(status) = statuses.get(&entry.id) {
                    entry.status = *status;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(entries: Vec<CatalogEntry>) -> CatalogSnapshot {
        CatalogSnapshot {
            entries,
            source: CatalogSource::Remote,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_store_rejects_lookups() {
        let store = CatalogStore::new();
        assert!(!store.is_loaded());
        let err = store.require(&PackageId::from("x")).unwrap_err();
        assert!(matches!(err, InstallError::UnknownPackage { .. }));
    }

    #[test]
    fn test_replace_keeps_status_for_same_version() {
        let store = CatalogStore::with_snapshot(snapshot(vec![CatalogEntry::new(
            "stellar_quest",
            "Stellar Quest",
            "2.2.3",
        )]));
        store.set_status(&PackageId::from("stellar_quest"), EntryStatus::Installed);

        store.replace(snapshot(vec![
            CatalogEntry::new("stellar_quest", "Stellar Quest", "2.2.3"),
            CatalogEntry::new("nebula_drift", "Nebula Drift", "1.0.0"),
        ]));

        let sq = store.entry(&PackageId::from("stellar_quest")).unwrap();
        assert_eq!(sq.status, EntryStatus::Installed);
        let nd = store.entry(&PackageId::from("nebula_drift")).unwrap();
        assert_eq!(nd.status, EntryStatus::Available);
    }

    #[test]
    fn test_replace_drops_status_when_version_moves() {
        let store = CatalogStore::with_snapshot(snapshot(vec![CatalogEntry::new(
            "stellar_quest",
            "Stellar Quest",
            "2.2.3",
        )]));
        store.set_status(&PackageId::from("stellar_quest"), EntryStatus::Installed);

        store.replace(snapshot(vec![CatalogEntry::new(
            "stellar_quest",
            "Stellar Quest",
            "2.3.0",
        )]));

        let sq = store.entry(&PackageId::from("stellar_quest")).unwrap();
        assert_eq!(sq.version, "2.3.0");
        assert_eq!(sq.status, EntryStatus::Available);
    }

    #[test]
    fn test_annotate_copies_statuses() {
        let store = CatalogStore::with_snapshot(snapshot(vec![
            CatalogEntry::new("a", "A", "1"),
            CatalogEntry::new("b", "B", "1"),
        ]));
        let mut annotated = store.entries();
        annotated[1].status = EntryStatus::UpdateAvailable;
        store.annotate(&annotated);

        let statuses: Vec<_> = store.entries().iter().map(|e| e.status).collect();
        assert_eq!(statuses, [EntryStatus::Available, EntryStatus::UpdateAvailable]);
    }
}
