//! Repair command handler.

use anyhow::Result;

use arcade_core::PackageId;
use arcade_install::RepairReport;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::prepare;
use crate::presentation::follow;

/// Execute the repair command.
///
/// A healthy install is left alone. A broken one is reinstalled; if that
/// fails the broken files stay where they were and the reasons are printed.
pub async fn execute(ctx: &CliContext, package_id: &str) -> Result<()> {
    prepare(ctx).await?;
    let package_id = PackageId::from(package_id);
    let launcher = ctx.launcher();

    let events = launcher.subscribe();
    let operation = launcher.repair(&package_id).map_err(CliError::from)?;
    let report = follow(launcher, operation, events)
        .await
        .map_err(CliError::from)?;

    print_report(&package_id, &report);
    if report.success {
        Ok(())
    } else {
        Err(CliError::Core(format!("Repair of {package_id} failed")).into())
    }
}

fn print_report(package_id: &PackageId, report: &RepairReport) {
    if report.success && report.repaired_files.is_empty() {
        println!("{package_id}: install is healthy, nothing to repair.");
        return;
    }
    if report.success {
        println!(
            "{package_id}: reinstalled {} file(s).",
            report.repaired_files.len()
        );
        for file in &report.repaired_files {
            println!("  {}", file.display());
        }
        return;
    }
    println!("{package_id}: repair failed.");
    for error in &report.errors {
        println!("  {error}");
    }
}
