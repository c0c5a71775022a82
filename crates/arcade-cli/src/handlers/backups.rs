//! Backups command handler.

use anyhow::Result;
use chrono::Local;

use arcade_core::PackageId;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::prepare;
use crate::presentation::print_separator;

/// Execute the backups command.
///
/// Lists retained snapshots oldest first, the order `restore` accepts them in.
pub async fn execute(ctx: &CliContext, package_id: &str) -> Result<()> {
    prepare(ctx).await?;
    let package_id = PackageId::from(package_id);

    let backups = ctx
        .launcher()
        .backups(&package_id)
        .await
        .map_err(CliError::from)?;
    if backups.is_empty() {
        println!("No backups retained for {package_id}.");
        return Ok(());
    }

    println!("{:<12} {:<20} Path", "Version", "Taken");
    print_separator(72);
    for backup in backups {
        println!(
            "{:<12} {:<20} {}",
            backup.version,
            backup
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S"),
            backup.path.display()
        );
    }
    Ok(())
}
