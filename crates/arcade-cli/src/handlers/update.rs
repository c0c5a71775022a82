//! Update command handler.

use anyhow::Result;

use arcade_core::PackageId;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::prepare;
use crate::presentation::follow;

/// Execute the update command.
///
/// The previous version is kept as a backup; a failed update leaves it live.
pub async fn execute(ctx: &CliContext, package_id: &str) -> Result<()> {
    prepare(ctx).await?;
    let package_id = PackageId::from(package_id);
    let launcher = ctx.launcher();

    let check = launcher
        .check_update(&package_id)
        .await
        .map_err(CliError::from)?;
    if !check.needs_update {
        println!("{package_id} is up to date ({}).", check.current_version);
        return Ok(());
    }
    println!(
        "Updating {package_id}: {} -> {}",
        check.current_version, check.latest_version
    );

    let events = launcher.subscribe();
    let operation = launcher.update(&package_id).map_err(CliError::from)?;
    let installed = follow(launcher, operation, events)
        .await
        .map_err(CliError::from)?;

    println!(
        "Updated {package_id} to {} in {}",
        check.latest_version,
        installed.install_dir.display()
    );
    if let Some(changelog) = check.changelog.filter(|c| !c.trim().is_empty()) {
        println!("\nChangelog:\n{changelog}");
    }
    Ok(())
}
