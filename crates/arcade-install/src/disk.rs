//! Free-space checks before downloading.
//!
//! Concurrent installs share one [`DiskBudget`], so two large downloads
//! cannot both pass the check against the same free space.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use sysinfo::Disks;

use arcade_core::{InstallError, InstallResult};

/// Reports free space for the volume holding a path.
#[cfg_attr(test, mockall::automock)]
pub trait DiskSpaceProbe: Send + Sync {
    /// Free bytes on the volume containing `path`, if it can be determined.
    fn available_bytes(&self, path: &Path) -> Option<u64>;
}

/// [`DiskSpaceProbe`] backed by `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoDiskSpace;

impl DiskSpaceProbe for SysinfoDiskSpace {
    fn available_bytes(&self, path: &Path) -> Option<u64> {
        let target = existing_ancestor(path)?;
        let disks = Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .filter(|d| target.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .map(sysinfo::Disk::available_space)
    }
}

fn existing_ancestor(path: &Path) -> Option<std::path::PathBuf> {
    path.ancestors()
        .find(|p| p.exists())
        .and_then(|p| p.canonicalize().ok())
}

/// Shared reservation ledger over a [`DiskSpaceProbe`].
#[derive(Clone)]
pub struct DiskBudget {
    probe: Arc<dyn DiskSpaceProbe>,
    reserved: Arc<Mutex<u64>>,
}

impl DiskBudget {
    /// Budget backed by `probe`.
    pub fn new(probe: Arc<dyn DiskSpaceProbe>) -> Self {
        Self {
            probe,
            reserved: Arc::new(Mutex::new(0)),
        }
    }

    /// Budget backed by `sysinfo`.
    pub fn system() -> Self {
        Self::new(Arc::new(SysinfoDiskSpace))
    }

    /// Bytes currently held by live reservations.
    pub fn reserved(&self) -> u64 {
        *self.reserved.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve `bytes` on the volume holding `path`.
    ///
    /// Fails with `DiskSpace` when free space minus outstanding reservations
    /// is too small. When free space cannot be determined the reservation is
    /// granted. The volume query runs on the blocking pool; the ledger lock
    /// is held only for the bookkeeping.
    pub async fn reserve(&self, path: &Path, bytes: u64) -> InstallResult<DiskReservation> {
        let probe = Arc::clone(&self.probe);
        let target = path.to_path_buf();
        let free = tokio::task::spawn_blocking(move || probe.available_bytes(&target))
            .await
            .map_err(|e| InstallError::other(format!("disk space query failed: {e}")))?;

        let mut reserved = self.reserved.lock().unwrap_or_else(PoisonError::into_inner);
        match free {
            Some(free) => {
                let available = free.saturating_sub(*reserved);
                if available < bytes {
                    return Err(InstallError::DiskSpace {
                        required: bytes,
                        available,
                    });
                }
            }
            None => {
                tracing::debug!(target: "arcade.install", path = %path.display(), "Free space unknown, skipping check");
            }
        }
        *reserved += bytes;
        Ok(DiskReservation {
            ledger: Arc::clone(&self.reserved),
            bytes,
        })
    }
}

impl std::fmt::Debug for DiskBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskBudget")
            .field("reserved", &self.reserved())
            .finish_non_exhaustive()
    }
}

/// Held for the duration of an install; releases its bytes on drop.
#[derive(Debug)]
pub struct DiskReservation {
    ledger: Arc<Mutex<u64>>,
    bytes: u64,
}

impl DiskReservation {
    /// Bytes reserved.
    pub const fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Drop for DiskReservation {
    fn drop(&mut self) {
        let mut reserved = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        *reserved = reserved.saturating_sub(self.bytes);
    }
}
