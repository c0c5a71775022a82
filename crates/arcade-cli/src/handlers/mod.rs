//! Command handlers that delegate to the launcher.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Thin wrappers that:
//!   1. Load the catalog and reconcile the install root
//!   2. Call launcher methods
//!   3. Format output for the terminal
//!
//! Handlers should NOT touch the registry, staging or install directories
//! directly.

pub mod backups;
pub mod check_update;
pub mod install;
pub mod launch;
pub mod list;
pub mod paths;
pub mod repair;
pub mod restore;
pub mod update;

use anyhow::Result;

use arcade_core::CatalogSource;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Load the catalog and reconcile it against the install root.
///
/// Every command that reads or changes installs starts here.
pub(crate) async fn prepare(ctx: &CliContext) -> Result<()> {
    let source = ctx
        .launcher()
        .refresh_catalog()
        .await
        .map_err(CliError::from)?;
    if source == CatalogSource::Cache {
        eprintln!("Offline: using the cached catalog.");
    }

    let report = ctx.launcher().scan().await.map_err(CliError::from)?;
    tracing::debug!(
        entries = report.entries.len(),
        records = report.records.len(),
        corrected = report.records_changed,
        "Install root reconciled"
    );
    Ok(())
}
