//! Core domain types and port definitions for the arcade launcher.
//!
//! This crate holds everything the orchestrator reasons about without touching
//! infrastructure:
//!
//! - `catalog` - catalog entries, mirrors, entry status and manifest parsing
//! - `installed` - installed records and backup snapshots
//! - `session` - download sessions and their state machine
//! - `events` - progress and status events sent to presentation
//! - `errors` - the install error taxonomy
//! - `ports` - trait abstractions implemented by adapter crates
//! - `paths` - data directory and install root resolution
//! - `settings` - launcher settings and validation
//! - `version` - lenient version ordering

#![deny(unused_crate_dependencies)]

pub mod catalog;
pub mod errors;
pub mod events;
pub mod installed;
pub mod paths;
pub mod ports;
pub mod session;
pub mod settings;
pub mod version;

// Re-export commonly used types for convenience
pub use catalog::{CatalogEntry, EntryStatus, Mirror, PackageId, parse_manifest, parse_size};
pub use errors::{InstallError, InstallResult, MirrorFailure};
pub use events::{EventStatus, InstallEvent};
pub use installed::{BackupSnapshot, InstalledRecord, MAX_BACKUPS};
pub use ports::{
    CatalogSnapshot, CatalogSource, InstallEventEmitterPort, InstalledStateRepositoryPort,
    ManifestError, ManifestProviderPort, NetworkProbePort, NetworkStatus, NoopInstallEmitter,
    RegistryError,
};
pub use session::{DownloadSession, SessionKind, SessionState};
pub use settings::{LauncherSettings, SettingsError, SettingsUpdate, validate_settings};
pub use version::{compare_versions, is_newer};

// Re-export path utilities
pub use paths::{PathError, ResolvedPaths, data_root, resolve_install_root};

// Silence unused dev-dependency warnings for crates only used by some test modules
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;
