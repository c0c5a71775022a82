//! Install pipeline, updates, repair and reconciliation.
//!
//! - `pipeline` - staging, archive verification, extraction and atomic publish
//! - `installer` - disk check plus download plus publish for one entry
//! - `update` - version checks, backup snapshots and rollback
//! - `repair` - install validation and reinstall-on-failure
//! - `reconcile` - install root scan and status annotation
//! - `registry` - JSON installed-state repository
//! - `store` - owned catalog state
//! - `launcher` - the orchestrator facade presentation talks to

pub mod archive;
pub mod disk;
pub mod executable;
mod fsutil;
pub mod installer;
pub mod launcher;
pub mod marker;
pub mod pipeline;
pub mod reconcile;
pub mod registry;
pub mod repair;
pub mod store;
pub mod update;

pub use archive::ArchiveFormat;
pub use disk::{DiskBudget, DiskReservation, DiskSpaceProbe, SysinfoDiskSpace};
pub use executable::{executable_score, resolve_executable};
pub use installer::{DEFAULT_SPACE_PERCENT, PackageInstaller};
pub use launcher::{LaunchedGame, Launcher, LauncherDeps, OperationHandle};
pub use marker::{InstallMarker, MARKER_FILE};
pub use pipeline::{InstalledPaths, PublishRequest, StagingArea, publish_archive};
pub use reconcile::{ScanReconciler, ScanReport};
pub use registry::JsonInstallRegistry;
pub use repair::{RepairEngine, RepairReport, validate_install};
pub use store::CatalogStore;
pub use update::{UpdateCheck, UpdateManager, backup_path};
