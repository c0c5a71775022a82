//! Install command handler.

use anyhow::Result;

use arcade_core::PackageId;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::prepare;
use crate::presentation::follow;

/// Execute the install command.
///
/// Mirrors are tried in catalog order; each failure is printed as it happens.
pub async fn execute(ctx: &CliContext, package_id: &str) -> Result<()> {
    prepare(ctx).await?;
    let package_id = PackageId::from(package_id);
    let launcher = ctx.launcher();

    let events = launcher.subscribe();
    let operation = launcher.install(&package_id).map_err(CliError::from)?;
    let installed = follow(launcher, operation, events)
        .await
        .map_err(CliError::from)?;

    println!("Installed {package_id} to {}", installed.install_dir.display());
    println!("Executable: {}", installed.executable_path.display());
    Ok(())
}
