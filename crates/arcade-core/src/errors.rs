//! Install error types.
//!
//! These errors are designed to be serializable and not depend on external
//! error types like `std::io::Error`. For I/O errors, we capture the kind
//! and message as strings.
//!
//! Recoverable errors (`Network`, `HttpStatus`) are absorbed by the mirror
//! engine and drive fallback. Everything else ends the operation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a single mirror attempt failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorFailure {
    /// Mirror name.
    pub mirror: String,
    /// Mirror URL.
    pub url: String,
    /// Human-readable reason.
    pub reason: String,
}

impl MirrorFailure {
    /// Create a mirror failure.
    pub fn new(
        mirror: impl Into<String>,
        url: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            mirror: mirror.into(),
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// Error type for install, update and repair operations.
///
/// Designed to be serializable across presentation boundaries without
/// depending on non-serializable types like `std::io::Error`.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum InstallError {
    /// Connection error, timeout or broken stream on one mirror.
    #[error("Network error on {mirror}: {message}")]
    Network {
        /// Mirror name.
        mirror: String,
        /// Detailed error message.
        message: String,
    },

    /// A mirror answered with a non-success HTTP status.
    #[error("HTTP {status} from {mirror}")]
    HttpStatus {
        /// Mirror name.
        mirror: String,
        /// HTTP status code.
        status: u16,
    },

    /// Every mirror was tried once and all failed.
    #[error("All {} mirrors failed", failures.len())]
    AllMirrorsExhausted {
        /// Per-mirror failure reasons in attempt order.
        failures: Vec<MirrorFailure>,
    },

    /// The archive is incomplete, malformed, unsafe or has no entry point.
    #[error("Extraction failed: {message}")]
    Extraction {
        /// Detailed error message.
        message: String,
    },

    /// Not enough free space on the install volume.
    #[error("Not enough disk space: {required} bytes required, {available} available")]
    DiskSpace {
        /// Bytes needed.
        required: u64,
        /// Bytes free.
        available: u64,
    },

    /// I/O error during file operations.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (e.g., "not found", "permission denied").
        kind: String,
        /// Detailed error message.
        message: String,
    },

    /// Another operation is already running for the package.
    #[error("An operation is already in progress for {package_id}")]
    AlreadyInProgress {
        /// Package id.
        package_id: String,
    },

    /// Cancel was requested for a package with no running operation.
    #[error("No active session for {package_id}")]
    NoActiveSession {
        /// Package id.
        package_id: String,
    },

    /// Validation of a live install failed; triggers a reinstall.
    #[error("Install validation failed: {reason}")]
    RepairValidation {
        /// What was wrong.
        reason: String,
    },

    /// Repair is not offered for the package.
    #[error("Repair is not enabled for {package_id}")]
    RepairDisabled {
        /// Package id.
        package_id: String,
    },

    /// The package id is not in the catalog.
    #[error("Unknown package: {package_id}")]
    UnknownPackage {
        /// Package id.
        package_id: String,
    },

    /// The package has no installed record.
    #[error("{package_id} is not installed")]
    NotInstalled {
        /// Package id.
        package_id: String,
    },

    /// The recorded executable is gone from the install directory.
    #[error("{package_id} executable not found at {path}")]
    ExecutableMissing {
        /// Package id.
        package_id: String,
        /// Expected executable path.
        path: String,
    },

    /// The package cannot be downloaded (coming soon or no mirrors).
    #[error("{package_id} has no downloadable mirrors")]
    NotDownloadable {
        /// Package id.
        package_id: String,
    },

    /// Update requested but the installed version is current.
    #[error("{package_id} is already at version {version}")]
    UpToDate {
        /// Package id.
        package_id: String,
        /// Installed version.
        version: String,
    },

    /// No retained backup for the requested version.
    #[error("No backup of {package_id} at version {version}")]
    BackupNotFound {
        /// Package id.
        package_id: String,
        /// Requested version.
        version: String,
    },

    /// Illegal session state transition.
    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: String,
        /// Requested state.
        to: String,
    },

    /// Installed-state persistence failed.
    #[error("Registry error: {message}")]
    Registry {
        /// Detailed error message.
        message: String,
    },

    /// Operation was cancelled by the user.
    #[error("Operation cancelled")]
    Cancelled,

    /// General/uncategorized error.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl InstallError {
    /// Create a network error for a mirror.
    pub fn network(mirror: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            mirror: mirror.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error for a mirror.
    pub fn http_status(mirror: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            mirror: mirror.into(),
            status,
        }
    }

    /// Create an extraction error.
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
        }
    }

    /// Create an I/O error from a `std::io::Error`.
    ///
    /// This captures the error kind name and message for serialization.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::Io {
            kind: format!("{kind:?}"),
            message: err.to_string(),
        }
    }

    /// Create an I/O error with context about what was being done.
    pub fn io_context(context: impl AsRef<str>, err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::Io {
            kind: format!("{kind:?}"),
            message: format!("{}: {err}", context.as_ref()),
        }
    }

    /// Create an already in progress error.
    pub fn already_in_progress(package_id: impl ToString) -> Self {
        Self::AlreadyInProgress {
            package_id: package_id.to_string(),
        }
    }

    /// Create a no active session error.
    pub fn no_active_session(package_id: impl ToString) -> Self {
        Self::NoActiveSession {
            package_id: package_id.to_string(),
        }
    }

    /// Create a repair validation error.
    pub fn repair_validation(reason: impl Into<String>) -> Self {
        Self::RepairValidation {
            reason: reason.into(),
        }
    }

    /// Create an unknown package error.
    pub fn unknown_package(package_id: impl ToString) -> Self {
        Self::UnknownPackage {
            package_id: package_id.to_string(),
        }
    }

    /// Create a not installed error.
    pub fn not_installed(package_id: impl ToString) -> Self {
        Self::NotInstalled {
            package_id: package_id.to_string(),
        }
    }

    /// Create a registry error.
    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry {
            message: message.into(),
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (next mirror may succeed).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::HttpStatus { .. })
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Per-mirror failure reasons, if this is an exhausted-mirrors error.
    pub fn mirror_failures(&self) -> &[MirrorFailure] {
        match self {
            Self::AllMirrorsExhausted { failures } => failures,
            _ => &[],
        }
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { mirror, message } => format!("{mirror}: {message}"),
            Self::HttpStatus { mirror, status } => format!("{mirror}: server returned HTTP {status}"),
            Self::AllMirrorsExhausted { failures } => {
                let reasons: Vec<String> = failures
                    .iter()
                    .map(|f| format!("{} ({})", f.mirror, f.reason))
                    .collect();
                format!("Download failed on every mirror: {}", reasons.join("; "))
            }
            Self::Extraction { message } => format!("The downloaded archive could not be installed: {message}"),
            Self::DiskSpace {
                required,
                available,
            } => format!(
                "Not enough disk space. Need {} MB, only {} MB free.",
                required / (1024 * 1024),
                available / (1024 * 1024)
            ),
            Self::Io { message, .. } => format!("File operation failed: {message}"),
            Self::AlreadyInProgress { package_id } => {
                format!("'{package_id}' is already being installed or updated.")
            }
            Self::NoActiveSession { package_id } => {
                format!("Nothing is running for '{package_id}'.")
            }
            Self::RepairValidation { reason } => format!("Install is damaged: {reason}"),
            Self::RepairDisabled { package_id } => {
                format!("Repair is not available for '{package_id}'.")
            }
            Self::UnknownPackage { package_id } => {
                format!("'{package_id}' is not in the catalog.")
            }
            Self::NotInstalled { package_id } => format!("'{package_id}' is not installed."),
            Self::ExecutableMissing { package_id, .. } => {
                format!("'{package_id}' is installed but its executable is missing. Try a repair.")
            }
            Self::NotDownloadable { package_id } => {
                format!("'{package_id}' is not available for download yet.")
            }
            Self::UpToDate {
                package_id,
                version,
            } => format!("'{package_id}' is already up to date ({version})."),
            Self::BackupNotFound {
                package_id,
                version,
            } => format!("No backup of '{package_id}' at version {version}."),
            Self::InvalidTransition { from, to } => {
                format!("Internal error: cannot move from {from} to {to}.")
            }
            Self::Registry { message } => format!("Could not save install state: {message}"),
            Self::Cancelled => "Operation was cancelled.".to_string(),
            Self::Other { message } => message.clone(),
        }
    }
}

/// Convenience result type for install operations.
pub type InstallResult<T> = Result<T, InstallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = InstallError::from_io_error(&io_err);

        match err {
            InstallError::Io { kind, message } => {
                assert_eq!(kind, "NotFound");
                assert!(message.contains("file not found"));
            }
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn test_error_serialization() {
        let err = InstallError::AllMirrorsExhausted {
            failures: vec![
                MirrorFailure::new("Primary", "https://a.example", "HTTP 503"),
                MirrorFailure::new("Backup", "https://b.example", "timed out"),
            ],
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("HTTP 503"));

        let parsed: InstallError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
        assert_eq!(parsed.mirror_failures().len(), 2);
    }

    #[test]
    fn test_is_recoverable() {
        assert!(InstallError::network("Primary", "connection reset").is_recoverable());
        assert!(InstallError::http_status("Primary", 503).is_recoverable());
        assert!(!InstallError::Cancelled.is_recoverable());
        assert!(!InstallError::extraction("bad zip").is_recoverable());
        assert!(
            !InstallError::DiskSpace {
                required: 10,
                available: 1
            }
            .is_recoverable()
        );
        assert!(!InstallError::AllMirrorsExhausted { failures: vec![] }.is_recoverable());
    }

    #[test]
    fn test_user_messages() {
        let err = InstallError::AllMirrorsExhausted {
            failures: vec![
                MirrorFailure::new("Primary", "https://a.example", "HTTP 500"),
                MirrorFailure::new("Backup", "https://b.example", "HTTP 502"),
            ],
        };
        let message = err.user_message();
        assert!(message.contains("Primary (HTTP 500)"));
        assert!(message.contains("Backup (HTTP 502)"));

        let err = InstallError::already_in_progress("stellar_quest");
        assert!(err.user_message().contains("stellar_quest"));
    }
}
