//! Manifest wire format.
//!
//! The manifest is a JSON document `{ "games": [...] }`. Each game either
//! declares a single `download_url` or a `download_urls` list of mirrors.

use std::collections::HashSet;

use serde::Deserialize;

use super::entry::{CatalogEntry, EntryStatus, Mirror, PackageId};
use super::size::parse_size;
use crate::ports::ManifestError;

/// Mirror name used when a game only declares `download_url`.
const SINGLE_MIRROR_NAME: &str = "Download";

#[derive(Debug, Deserialize)]
struct ManifestDocument {
    #[serde(default)]
    games: Vec<ManifestGame>,
}

#[derive(Debug, Deserialize)]
struct ManifestGame {
    id: String,
    name: String,
    version: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    download_urls: Vec<ManifestMirror>,
    #[serde(default)]
    executable_path: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    logo_url: Option<String>,
    #[serde(default)]
    background_id: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    file_size: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    changelog: Option<String>,
    #[serde(default)]
    is_coming_soon: bool,
    #[serde(default)]
    repair_enabled: bool,
}

#[derive(Debug, Deserialize)]
struct ManifestMirror {
    name: String,
    url: String,
    #[serde(default, rename = "type")]
    content_type: Option<String>,
    #[serde(default)]
    size: Option<SizeField>,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    sha256: Option<String>,
}

/// Sizes appear both as numbers and as human strings in the wild.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeField {
    Bytes(u64),
    Text(String),
}

impl SizeField {
    fn bytes(&self) -> Option<u64> {
        match self {
            Self::Bytes(n) => Some(*n),
            Self::Text(s) => parse_size(s),
        }
    }
}

impl ManifestGame {
    fn into_entry(self) -> CatalogEntry {
        let mut mirrors: Vec<Mirror> = self
            .download_urls
            .into_iter()
            .filter(|m| !m.url.trim().is_empty())
            .map(|m| Mirror {
                size_bytes: m.size.as_ref().and_then(SizeField::bytes),
                name: m.name,
                url: m.url,
                content_type: m.content_type,
                is_primary: m.primary,
                sha256: m.sha256.map(|h| h.to_ascii_lowercase()),
            })
            .collect();

        if mirrors.is_empty() {
            if let Some(url) = self.download_url.filter(|u| !u.trim().is_empty()) {
                let mut mirror = Mirror::new(SINGLE_MIRROR_NAME, url).primary();
                mirror.size_bytes = self.file_size.as_deref().and_then(parse_size);
                mirrors.push(mirror);
            }
        }

        let is_coming_soon = self.is_coming_soon
            || self
                .status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("coming_soon"));

        CatalogEntry {
            id: PackageId::new(self.id),
            name: self.name,
            version: self.version,
            status: if is_coming_soon {
                EntryStatus::ComingSoon
            } else {
                EntryStatus::Available
            },
            mirrors,
            executable_hint: self.executable_path.filter(|p| !p.trim().is_empty()),
            repair_enabled: self.repair_enabled,
            is_coming_soon,
            description: self.description,
            file_size: self.file_size,
            release_date: self.release_date,
            changelog: self.changelog,
            image_url: self.image_url,
            logo_url: self.logo_url,
            background_id: self.background_id,
        }
    }
}

/// Parse a manifest document into catalog entries.
///
/// Entries with an empty id are skipped, and for duplicate ids the first
/// declaration wins. Status is reset to `Available`/`ComingSoon`; local
/// state is layered on later by the scan reconciler.
pub fn parse_manifest(json: &str) -> Result<Vec<CatalogEntry>, ManifestError> {
    let document: ManifestDocument =
        serde_json::from_str(json).map_err(|e| ManifestError::Parse(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(document.games.len());
    for game in document.games {
        if game.id.trim().is_empty() {
            tracing::warn!(name = %game.name, "Skipping manifest entry without an id");
            continue;
        }
        if !seen.insert(game.id.clone()) {
            tracing::warn!(id = %game.id, "Skipping duplicate manifest entry");
            continue;
        }
        entries.push(game.into_entry());
    }

    Ok(entries)
}
