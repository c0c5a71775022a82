//! Install events - the single payload shape sent to presentation.
//!
//! Every session transition and progress sample becomes one `InstallEvent`.
//! Progress events may be coalesced by slow subscribers; every other status
//! is delivered.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::catalog::PackageId;
use crate::errors::MirrorFailure;
use crate::session::SessionKind;

/// Status carried by an [`InstallEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Session admitted.
    Started,
    /// Progress sample.
    Progress,
    /// A mirror failed and the engine moved on.
    MirrorFailed,
    /// Download finished; extracting and publishing.
    Extracting,
    /// Operation finished successfully.
    Completed,
    /// Operation cancelled; partial data removed.
    Cancelled,
    /// Operation failed.
    Error,
}

impl EventStatus {
    /// Whether this status ends the session.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Error)
    }

    /// Whether a newer event of the same package may replace this one.
    #[must_use]
    pub const fn is_coalescible(&self) -> bool {
        matches!(self, Self::Progress)
    }
}

/// Progress/status event for one package.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstallEvent {
    /// Package the event belongs to.
    pub package_id: PackageId,
    /// Operation kind.
    pub kind: SessionKind,
    /// Mirror involved, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_name: Option<String>,
    /// Event status.
    pub status: EventStatus,
    /// Percentage complete, when the total is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<f64>,
    /// Bytes received so far in this session.
    pub bytes_downloaded: u64,
    /// Total bytes, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    /// Instantaneous speed.
    pub bytes_per_second: f64,
    /// Human-readable detail (failure cause, mirror failure reason).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Live install directory (completed events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_dir: Option<PathBuf>,
    /// Resolved executable (completed events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<PathBuf>,
}

impl InstallEvent {
    fn base(package_id: &PackageId, kind: SessionKind, status: EventStatus) -> Self {
        Self {
            package_id: package_id.clone(),
            kind,
            mirror_name: None,
            status,
            progress_percent: None,
            bytes_downloaded: 0,
            total_bytes: None,
            bytes_per_second: 0.0,
            message: None,
            install_dir: None,
            executable_path: None,
        }
    }

    /// Session admitted.
    pub fn started(package_id: &PackageId, kind: SessionKind) -> Self {
        Self::base(package_id, kind, EventStatus::Started)
    }

    /// Progress sample.
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(
        package_id: &PackageId,
        kind: SessionKind,
        mirror_name: &str,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
        bytes_per_second: f64,
    ) -> Self {
        let progress_percent = total_bytes
            .filter(|t| *t > 0)
            .map(|t| (bytes_downloaded as f64 / t as f64 * 100.0).min(100.0));
        Self {
            mirror_name: Some(mirror_name.to_string()),
            progress_percent,
            bytes_downloaded,
            total_bytes,
            bytes_per_second,
            ..Self::base(package_id, kind, EventStatus::Progress)
        }
    }

    /// A mirror failed; the engine advances to the next one.
    pub fn mirror_failed(package_id: &PackageId, kind: SessionKind, failure: &MirrorFailure) -> Self {
        Self {
            mirror_name: Some(failure.mirror.clone()),
            message: Some(failure.reason.clone()),
            ..Self::base(package_id, kind, EventStatus::MirrorFailed)
        }
    }

    /// Extraction phase entered.
    pub fn extracting(package_id: &PackageId, kind: SessionKind, bytes_downloaded: u64) -> Self {
        Self {
            bytes_downloaded,
            ..Self::base(package_id, kind, EventStatus::Extracting)
        }
    }

    /// Operation completed.
    pub fn completed(
        package_id: &PackageId,
        kind: SessionKind,
        install_dir: Option<PathBuf>,
        executable_path: Option<PathBuf>,
    ) -> Self {
        Self {
            progress_percent: Some(100.0),
            install_dir,
            executable_path,
            ..Self::base(package_id, kind, EventStatus::Completed)
        }
    }

    /// Operation cancelled.
    pub fn cancelled(package_id: &PackageId, kind: SessionKind) -> Self {
        Self::base(package_id, kind, EventStatus::Cancelled)
    }

    /// Operation failed.
    pub fn error(package_id: &PackageId, kind: SessionKind, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::base(package_id, kind, EventStatus::Error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_event_computes_percent() {
        let id = PackageId::from("stellar_quest");
        let event = InstallEvent::progress(&id, SessionKind::Install, "Primary", 50, Some(200), 10.0);
        assert_eq!(event.progress_percent, Some(25.0));
        assert_eq!(event.mirror_name.as_deref(), Some("Primary"));

        let unknown = InstallEvent::progress(&id, SessionKind::Install, "Primary", 50, None, 10.0);
        assert_eq!(unknown.progress_percent, None);
    }

    #[test]
    fn test_event_serializes_snake_case() {
        let id = PackageId::from("stellar_quest");
        let failure = MirrorFailure::new("Primary", "https://a.example/sq.zip", "timed out");
        let event = InstallEvent::mirror_failed(&id, SessionKind::Update, &failure);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "mirror_failed");
        assert_eq!(json["kind"], "update");
        assert_eq!(json["package_id"], "stellar_quest");
        assert_eq!(json["message"], "timed out");
        assert!(json.get("install_dir").is_none());
    }

    #[test]
    fn test_only_progress_is_coalescible() {
        assert!(EventStatus::Progress.is_coalescible());
        for status in [
            EventStatus::Started,
            EventStatus::MirrorFailed,
            EventStatus::Extracting,
            EventStatus::Completed,
            EventStatus::Cancelled,
            EventStatus::Error,
        ] {
            assert!(!status.is_coalescible());
        }
    }
}
