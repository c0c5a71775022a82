//! Check-update command handler.

use anyhow::Result;

use arcade_core::PackageId;
use arcade_install::UpdateCheck;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::prepare;

/// Execute the check-update command.
///
/// With `current`, that version is compared instead of the installed one, so
/// the command also works for games installed elsewhere.
pub async fn execute(
    ctx: &CliContext,
    package_id: &str,
    current: Option<&str>,
    json: bool,
) -> Result<()> {
    prepare(ctx).await?;
    let package_id = PackageId::from(package_id);
    let launcher = ctx.launcher();

    let check = match current {
        Some(version) => launcher.check_update_against(&package_id, version),
        None => launcher.check_update(&package_id).await,
    }
    .map_err(CliError::from)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&check)?);
    } else {
        println!("{}", summary(&check));
    }
    Ok(())
}

fn summary(check: &UpdateCheck) -> String {
    if check.needs_update {
        format!(
            "{}: update available ({} -> {})",
            check.package_id, check.current_version, check.latest_version
        )
    } else {
        format!(
            "{}: up to date ({}, catalog {})",
            check.package_id, check.current_version, check.latest_version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let mut check = UpdateCheck {
            package_id: PackageId::from("stellar_quest"),
            current_version: "2.2.3".to_string(),
            latest_version: "2.3.0".to_string(),
            needs_update: true,
            changelog: None,
        };
        assert_eq!(
            summary(&check),
            "stellar_quest: update available (2.2.3 -> 2.3.0)"
        );

        check.needs_update = false;
        assert!(summary(&check).contains("up to date"));
    }
}
