//! Session kinds, states and the per-package session record.
//!
//! Legal transitions are checked by [`SessionState::can_transition_to`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::PackageId;

/// What a session was opened for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// First install of a package.
    Install,
    /// Replace the live version with the catalog version.
    Update,
    /// Validate and, if needed, reinstall.
    Repair,
    /// Roll back to a retained backup.
    Restore,
}

impl SessionKind {
    /// String form used in logs and listings.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::Repair => "repair",
            Self::Restore => "restore",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a download session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not running (initial state, and the state after cancellation).
    #[default]
    Idle,
    /// Admitted; no bytes received yet.
    Started,
    /// Receiving bytes from a mirror.
    InProgress,
    /// Archive downloaded; extracting and publishing.
    Extracting,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

impl SessionState {
    /// Whether no further transitions are allowed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `next` is a legal successor of this state.
    ///
    /// `Started -> Completed` covers sessions with nothing to transfer
    /// (repair of a healthy install, restoring a backup). `InProgress` may
    /// repeat across mirror fallbacks.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        match (self, next) {
            (Self::Completed | Self::Failed, _) => false,
            (_, Self::Failed) => true,
            (Self::Idle, Self::Started)
            | (Self::Started | Self::InProgress, Self::InProgress | Self::Extracting)
            | (Self::Started | Self::Extracting, Self::Completed)
            | (Self::Started | Self::InProgress | Self::Extracting, Self::Idle) => true,
            _ => false,
        }
    }

    /// String form used in logs and listings.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Started => "started",
            Self::InProgress => "in_progress",
            Self::Extracting => "extracting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one live operation on a package.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadSession {
    /// Package being operated on.
    pub package_id: PackageId,
    /// Operation kind.
    pub kind: SessionKind,
    /// Index (into the ordered mirror list) of the mirror being attempted.
    pub mirror_index: usize,
    /// Name of the mirror being attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_name: Option<String>,
    /// Current state.
    pub state: SessionState,
    /// Bytes received (never decreases within a session).
    pub bytes_downloaded: u64,
    /// Total bytes if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    /// Instantaneous speed in bytes per second.
    pub bytes_per_second: f64,
    /// Last error seen (including recoverable mirror failures).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// When the session was admitted.
    pub started_at: DateTime<Utc>,
}

impl DownloadSession {
    /// Create a session in the `Idle` state.
    pub fn new(package_id: PackageId, kind: SessionKind) -> Self {
        Self {
            package_id,
            kind,
            mirror_index: 0,
            mirror_name: None,
            state: SessionState::Idle,
            bytes_downloaded: 0,
            total_bytes: None,
            bytes_per_second: 0.0,
            last_error: None,
            started_at: Utc::now(),
        }
    }

    /// Percentage complete, if the total is known.
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                Some((self.bytes_downloaded as f64 / total as f64 * 100.0).min(100.0))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use SessionState::*;
        assert!(Idle.can_transition_to(Started));
        assert!(Started.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Extracting));
        assert!(Extracting.can_transition_to(Completed));
    }

    #[test]
    fn test_terminal_states_are_final() {
        use SessionState::*;
        for next in [Idle, Started, InProgress, Extracting, Completed, Failed] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Failed.can_transition_to(next));
        }
    }

    #[test]
    fn test_any_live_state_can_fail_or_cancel() {
        use SessionState::*;
        for state in [Idle, Started, InProgress, Extracting] {
            assert!(state.can_transition_to(Failed), "{state} -> failed");
        }
        for state in [Started, InProgress, Extracting] {
            assert!(state.can_transition_to(Idle), "{state} -> idle");
        }
        assert!(!Idle.can_transition_to(Idle));
    }

    #[test]
    fn test_cannot_skip_admission() {
        use SessionState::*;
        assert!(!Idle.can_transition_to(InProgress));
        assert!(!Idle.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(Completed));
    }

    #[test]
    fn test_progress_percent() {
        let mut session = DownloadSession::new(PackageId::from("a"), SessionKind::Install);
        assert_eq!(session.progress_percent(), None);
        session.total_bytes = Some(200);
        session.bytes_downloaded = 50;
        assert_eq!(session.progress_percent(), Some(25.0));
    }
}
