//! Main commands enum.
//!
//! This module defines the available commands for the CLI tool.

use clap::Subcommand;

/// Available commands for the arcade launcher.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show resolved paths for all launcher directories
    Paths,

    /// Scan the install root and list the catalog with install status
    List,

    /// Download and install a game
    Install {
        /// Package id from the catalog (e.g. "stellar_quest")
        package_id: String,
    },

    /// Update an installed game to the catalog version
    Update {
        /// Package id of the installed game
        package_id: String,
    },

    /// Compare an installed version with the catalog
    CheckUpdate {
        /// Package id from the catalog
        package_id: String,
        /// Compare this version instead of the installed one
        #[arg(long)]
        current: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start an installed game
    Launch {
        /// Package id of the installed game
        package_id: String,
    },

    /// Validate an install and reinstall it if broken
    Repair {
        /// Package id of the installed game
        package_id: String,
    },

    /// List retained backups of a game
    Backups {
        /// Package id of the installed game
        package_id: String,
    },

    /// Roll a game back to a retained backup
    Restore {
        /// Package id of the installed game
        package_id: String,
        /// Backup version to restore
        version: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Commands;
    use crate::parser::Cli;

    #[test]
    fn test_check_update_with_current() {
        let cli = Cli::parse_from([
            "arcade",
            "check-update",
            "stellar_quest",
            "--current",
            "2.2.1",
        ]);
        match cli.command {
            Some(Commands::CheckUpdate {
                package_id,
                current,
                json,
            }) => {
                assert_eq!(package_id, "stellar_quest");
                assert_eq!(current.as_deref(), Some("2.2.1"));
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_restore_takes_id_and_version() {
        let cli = Cli::parse_from(["arcade", "restore", "stellar_quest", "2.2.3"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Restore { package_id, version })
                if package_id == "stellar_quest" && version == "2.2.3"
        ));
    }

    #[test]
    fn test_launch_takes_package_id() {
        let cli = Cli::parse_from(["arcade", "launch", "stellar_quest"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Launch { package_id }) if package_id == "stellar_quest"
        ));
    }

    #[test]
    fn test_install_requires_package_id() {
        assert!(Cli::try_parse_from(["arcade", "install"]).is_err());
    }
}
