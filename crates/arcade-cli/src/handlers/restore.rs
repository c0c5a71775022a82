//! Restore command handler.

use anyhow::Result;

use arcade_core::PackageId;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::prepare;
use crate::presentation::follow;

/// Execute the restore command.
///
/// The live version becomes a backup in turn, so a restore can be undone.
pub async fn execute(ctx: &CliContext, package_id: &str, version: &str) -> Result<()> {
    prepare(ctx).await?;
    let package_id = PackageId::from(package_id);
    let launcher = ctx.launcher();

    let events = launcher.subscribe();
    let operation = launcher
        .restore(&package_id, version)
        .map_err(CliError::from)?;
    let executable = follow(launcher, operation, events)
        .await
        .map_err(CliError::from)?;

    println!("Restored {package_id} {version}");
    println!("Executable: {}", executable.display());
    Ok(())
}
