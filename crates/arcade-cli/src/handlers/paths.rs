//! Paths command handler.
//!
//! Displays all resolved paths for diagnostics.

use anyhow::Result;

use arcade_manifest::DEFAULT_MANIFEST_URL;

use crate::bootstrap::{CliConfig, ManifestLocation, describe, resolve_layout};

/// Execute the paths command.
///
/// Prints every path in `key = value` form, plus the manifest location the
/// other commands would use. Nothing is fetched.
pub fn execute(config: &CliConfig) -> Result<()> {
    let (paths, settings) = resolve_layout(config)?;
    println!("{paths}");

    let manifest = config
        .manifest
        .clone()
        .or(settings.manifest_url)
        .unwrap_or_else(|| DEFAULT_MANIFEST_URL.to_string());
    println!("manifest = {}", describe(&ManifestLocation::parse(&manifest)));
    Ok(())
}
