//! List command handler.
//!
//! Displays the catalog with each entry's install status.

use anyhow::Result;

use arcade_core::{EntryStatus, InstalledRecord};
use indicatif::HumanBytes;

use crate::bootstrap::CliContext;
use crate::handlers::prepare;
use crate::presentation::{format_optional, print_separator, truncate_string};

/// Execute the list command.
///
/// Scans the install root first, so directories removed by hand show up as
/// available again.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    prepare(ctx).await?;

    let entries = ctx.launcher().entries();
    if entries.is_empty() {
        println!("The catalog is empty.");
        return Ok(());
    }
    let installed = ctx.launcher().installed().await?;

    println!("{} game(s) in the catalog:\n", entries.len());
    println!(
        "{:<20} {:<24} {:<10} {:<10} {:<10} Status",
        "ID", "Name", "Latest", "Installed", "Size"
    );
    print_separator(92);

    for entry in entries {
        let local = installed_version(&installed, entry.id.as_str());
        let size = entry.declared_size().map(HumanBytes);
        println!(
            "{:<20} {:<24} {:<10} {:<10} {:<10} {}",
            truncate_string(entry.id.as_str(), 19),
            truncate_string(&entry.name, 23),
            truncate_string(&entry.version, 9),
            truncate_string(&format_optional(local.as_ref(), "--"), 9),
            format_optional(size.as_ref(), "--"),
            status_label(entry.status)
        );
    }

    Ok(())
}

fn installed_version(records: &[InstalledRecord], package_id: &str) -> Option<String> {
    records
        .iter()
        .find(|r| r.package_id.as_str() == package_id)
        .map(|r| r.installed_version.clone())
}

/// Human-readable status.
pub const fn status_label(status: EntryStatus) -> &'static str {
    match status {
        EntryStatus::Available => "available",
        EntryStatus::Installed => "installed",
        EntryStatus::UpdateAvailable => "update available",
        EntryStatus::ComingSoon => "coming soon",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::PackageId;
    use std::path::PathBuf;

    #[test]
    fn test_status_labels() {
        assert_eq!(status_label(EntryStatus::UpdateAvailable), "update available");
        assert_eq!(status_label(EntryStatus::ComingSoon), "coming soon");
    }

    #[test]
    fn test_installed_version_lookup() {
        let records = vec![InstalledRecord::new(
            PackageId::from("stellar_quest"),
            "2.2.3",
            PathBuf::from("/games/stellar_quest"),
            PathBuf::from("StellarQuest.exe"),
        )];
        assert_eq!(
            installed_version(&records, "stellar_quest").as_deref(),
            Some("2.2.3")
        );
        assert!(installed_version(&records, "pixel_pilot").is_none());
    }
}
