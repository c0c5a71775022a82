//! Installed-state repository port.

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::PackageId;
use crate::errors::InstallError;
use crate::installed::InstalledRecord;

/// Errors from installed-state persistence.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<RegistryError> for InstallError {
    fn from(err: RegistryError) -> Self {
        Self::registry(err.to_string())
    }
}

/// Port for persisting `InstalledRecord`s across restarts.
///
/// Writes must be atomic: a crash mid-write leaves the previous state readable.
#[async_trait]
pub trait InstalledStateRepositoryPort: Send + Sync {
    /// Load every record.
    async fn list(&self) -> Result<Vec<InstalledRecord>, RegistryError>;

    /// Load one record.
    async fn get(&self, package_id: &PackageId) -> Result<Option<InstalledRecord>, RegistryError>;

    /// Insert or replace a record.
    async fn upsert(&self, record: &InstalledRecord) -> Result<(), RegistryError>;

    /// Remove a record. Removing a missing record is not an error.
    async fn remove(&self, package_id: &PackageId) -> Result<(), RegistryError>;
}
