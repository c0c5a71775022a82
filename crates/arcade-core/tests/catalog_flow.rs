//! Manifest parsing through status resolution.

use arcade_core::{EntryStatus, InstalledRecord, compare_versions, is_newer, parse_manifest};
use std::cmp::Ordering;
use std::path::PathBuf;

const MANIFEST: &str = r#"{
  "games": [
    {
      "id": "stellar_quest",
      "name": "Stellar Quest",
      "version": "2.2.3",
      "executable_path": "StellarQuest.exe",
      "file_size": "1.5 GB",
      "repair_enabled": true,
      "download_urls": [
        { "name": "Secondary", "url": "https://cdn-b.example/sq-2.2.3.zip", "type": "application/zip" },
        { "name": "Primary", "url": "https://cdn-a.example/sq-2.2.3.zip", "primary": true, "size": 1610612736 }
      ]
    },
    {
      "id": "nebula_drift",
      "name": "Nebula Drift",
      "version": "0.9",
      "status": "coming_soon"
    }
  ]
}"#;

#[test]
fn manifest_entries_resolve_against_installed_records() {
    let entries = parse_manifest(MANIFEST).unwrap();
    assert_eq!(entries.len(), 2);

    let quest = &entries[0];
    let ordered = quest.ordered_mirrors();
    assert_eq!(ordered[0].name, "Primary");
    assert_eq!(ordered[1].name, "Secondary");
    assert_eq!(quest.declared_size(), Some(1_610_612_736));
    assert!(quest.is_downloadable());

    let record = InstalledRecord::new(
        quest.id.clone(),
        "2.2.1",
        PathBuf::from("/games/stellar_quest"),
        PathBuf::from("StellarQuest.exe"),
    );
    let status = EntryStatus::resolve(
        quest.is_coming_soon,
        true,
        Some(&record.installed_version),
        &quest.version,
    );
    assert_eq!(status, EntryStatus::UpdateAvailable);

    let nebula = &entries[1];
    assert!(!nebula.is_downloadable());
    assert_eq!(
        EntryStatus::resolve(nebula.is_coming_soon, false, None, &nebula.version),
        EntryStatus::ComingSoon
    );
}

#[test]
fn version_bump_from_manifest_is_detected() {
    let updated = MANIFEST.replace("\"2.2.3\"", "\"2.3.0\"");
    let entries = parse_manifest(&updated).unwrap();

    assert!(is_newer(&entries[0].version, "2.2.3"));
    assert_eq!(compare_versions("2.3.0", "v2.3"), Ordering::Equal);
    assert_eq!(
        EntryStatus::resolve(false, true, Some("2.3.0"), &entries[0].version),
        EntryStatus::Installed
    );
}
