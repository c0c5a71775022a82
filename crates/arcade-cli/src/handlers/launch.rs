//! Launch command handler.

use anyhow::Result;

use arcade_core::PackageId;
use arcade_install::LaunchedGame;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::prepare;

/// Execute the launch command.
///
/// Returns once the game process has started; the game keeps running after
/// the CLI exits.
pub async fn execute(ctx: &CliContext, package_id: &str) -> Result<()> {
    prepare(ctx).await?;
    let package_id = PackageId::from(package_id);

    let launched = ctx
        .launcher()
        .launch(&package_id)
        .await
        .map_err(CliError::from)?;
    println!("{}", summary(&launched));
    Ok(())
}

fn summary(launched: &LaunchedGame) -> String {
    match launched.pid {
        Some(pid) => format!("Started {} (pid {pid})", launched.package_id),
        None => format!("Started {}", launched.package_id),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_summary_with_and_without_pid() {
        let mut launched = LaunchedGame {
            package_id: PackageId::from("stellar_quest"),
            executable: PathBuf::from("/games/stellar_quest/StellarQuest.exe"),
            pid: Some(4242),
        };
        assert_eq!(summary(&launched), "Started stellar_quest (pid 4242)");

        launched.pid = None;
        assert_eq!(summary(&launched), "Started stellar_quest");
    }
}
