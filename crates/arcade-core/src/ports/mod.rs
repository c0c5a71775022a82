//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `reqwest` or filesystem types in any signature
//! - Repositories are small and keyed by `PackageId`
//! - Event emission never blocks the caller

pub mod event_emitter;
pub mod installed_state;
pub mod manifest;
pub mod network;

pub use event_emitter::{InstallEventEmitterPort, NoopInstallEmitter};
pub use installed_state::{InstalledStateRepositoryPort, RegistryError};
pub use manifest::{CatalogSnapshot, CatalogSource, ManifestError, ManifestProviderPort};
pub use network::{NetworkProbePort, NetworkStatus};
