//! CLI-specific error types and mappings.
//!
//! This module maps launcher errors to exit codes and user-facing messages.

use arcade_core::{InstallError, ManifestError, PathError, SettingsError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Launcher operation failed.
    #[error("{0}")]
    Core(String),

    /// Argument parsing error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog could not be loaded.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// Operation cancelled by the user.
    #[error("Cancelled")]
    Cancelled,
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    /// - 130: Interrupted
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Core(_) => 1,
            Self::Arguments(_) => 2,   // EX_USAGE
            Self::Unavailable(_) => 69, // EX_UNAVAILABLE
            Self::Io(_) => 74,         // EX_IOERR
            Self::Config(_) => 78,     // EX_CONFIG
            Self::Cancelled => 130,
        }
    }
}

impl From<InstallError> for CliError {
    fn from(err: InstallError) -> Self {
        match err {
            InstallError::Cancelled => Self::Cancelled,
            InstallError::UnknownPackage { .. } => Self::Arguments(err.user_message()),
            InstallError::Io { .. } => Self::Io(err.user_message()),
            other => Self::Core(other.user_message()),
        }
    }
}

impl From<ManifestError> for CliError {
    fn from(err: ManifestError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<PathError> for CliError {
    fn from(err: PathError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Exit code for an error bubbled up to `main`.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<CliError>().map_or(1, CliError::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Arguments(String::new()).exit_code(), 2);
        assert_eq!(CliError::Config(String::new()).exit_code(), 78);
        assert_eq!(CliError::Cancelled.exit_code(), 130);
    }

    #[test]
    fn test_install_errors_map_by_kind() {
        assert!(matches!(
            CliError::from(InstallError::Cancelled),
            CliError::Cancelled
        ));
        assert!(matches!(
            CliError::from(InstallError::unknown_package("ghost")),
            CliError::Arguments(_)
        ));
        assert!(matches!(
            CliError::from(InstallError::not_installed("ghost")),
            CliError::Core(_)
        ));
    }

    #[test]
    fn test_exit_code_for_plain_anyhow_is_general() {
        assert_eq!(exit_code_for(&anyhow::anyhow!("boom")), 1);
        let wrapped = anyhow::Error::from(CliError::Cancelled);
        assert_eq!(exit_code_for(&wrapped), 130);
    }
}
