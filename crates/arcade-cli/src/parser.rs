//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for the arcade launcher.
///
/// Global options override the matching `settings.json` values for one
/// invocation.
#[derive(Parser)]
#[command(name = "arcade")]
#[command(about = "Install, update and repair games from the arcade catalog")]
#[command(version)]
pub struct Cli {
    /// Override the install root for this invocation
    #[arg(long = "install-root", global = true, env = "ARCADE_GAMES_DIR")]
    pub install_root: Option<PathBuf>,

    /// Override the launcher data directory
    #[arg(long = "data-dir", global = true, env = "ARCADE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Manifest URL or path to a local manifest file
    #[arg(long = "manifest", global = true, env = "ARCADE_MANIFEST")]
    pub manifest: Option<String>,

    /// Enable verbose output (repeat for debug)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Default tracing directive for the chosen verbosity.
    pub const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "arcade",
            "-vv",
            "--install-root",
            "/tmp/games",
            "--manifest",
            "./manifest.json",
            "list",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_level(), "debug");
        assert_eq!(cli.install_root, Some(PathBuf::from("/tmp/games")));
        assert_eq!(cli.manifest.as_deref(), Some("./manifest.json"));
        assert!(matches!(cli.command, Some(Commands::List)));
    }

    #[test]
    fn test_quiet_by_default() {
        let cli = Cli::parse_from(["arcade", "paths"]);
        assert_eq!(cli.log_level(), "warn");
    }
}
