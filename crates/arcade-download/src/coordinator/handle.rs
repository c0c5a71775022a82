//! Handle owning one admitted session.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use arcade_core::{
    DownloadSession, InstallError, InstallEvent, InstallResult, Mirror, MirrorFailure, PackageId,
    SessionKind, SessionState,
};

use super::SessionCoordinator;
use crate::engine::{FetchReporter, ProgressSample};

/// Drives one session from admission to a terminal state.
///
/// The handle is the only way to advance the session. Finishing consumes it;
/// dropping an unfinished handle releases the slot as failed.
pub struct SessionHandle {
    coordinator: Arc<SessionCoordinator>,
    package_id: PackageId,
    kind: SessionKind,
    lease: u64,
    cancel: CancellationToken,
    finished: bool,
}

impl SessionHandle {
    pub(super) fn new(
        coordinator: Arc<SessionCoordinator>,
        package_id: PackageId,
        kind: SessionKind,
        lease: u64,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            coordinator,
            package_id,
            kind,
            lease,
            cancel,
            finished: false,
        }
    }

    /// Package this session operates on.
    pub const fn package_id(&self) -> &PackageId {
        &self.package_id
    }

    /// Operation kind.
    pub const fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Lease id distinguishing this session from later ones on the same package.
    pub const fn lease(&self) -> u64 {
        self.lease
    }

    /// Cancellation token observed by the worker.
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Current copy of the session.
    pub fn snapshot(&self) -> Option<DownloadSession> {
        self.coordinator
            .session(&self.package_id)
            .filter(|_| !self.finished)
    }

    /// Enter the extraction phase.
    pub fn extracting(&self) -> InstallResult<()> {
        let kind = self.kind;
        self.coordinator.transition(
            &self.package_id,
            self.lease,
            SessionState::Extracting,
            |session| InstallEvent::extracting(&session.package_id, kind, session.bytes_downloaded),
        )
    }

    /// Finish successfully.
    pub fn complete(mut self, install_dir: Option<PathBuf>, executable_path: Option<PathBuf>) {
        self.finished = true;
        self.coordinator.release(
            &self.package_id,
            self.lease,
            SessionState::Completed,
            InstallEvent::completed(&self.package_id, self.kind, install_dir, executable_path),
        );
    }

    /// Finish with an error. Cancellation returns the session to `Idle` and
    /// reports `Cancelled`; anything else is `Failed`.
    pub fn fail(mut self, error: &InstallError) {
        self.finished = true;
        self.finish_with_error(error);
    }

    fn finish_with_error(&self, error: &InstallError) {
        if error.is_cancelled() {
            self.coordinator.release(
                &self.package_id,
                self.lease,
                SessionState::Idle,
                InstallEvent::cancelled(&self.package_id, self.kind),
            );
            return;
        }

        tracing::warn!(
            target: "arcade.download",
            package_id = %self.package_id,
            kind = %self.kind,
            error = %error,
            "Session failed"
        );
        self.coordinator.release(
            &self.package_id,
            self.lease,
            SessionState::Failed,
            InstallEvent::error(&self.package_id, self.kind, error.user_message()),
        );
    }
}

impl FetchReporter for SessionHandle {
    fn attempt_started(&self, index: usize, mirror: &Mirror) {
        self.coordinator
            .update(&self.package_id, self.lease, |session| {
                session.mirror_index = index;
                session.mirror_name = Some(mirror.name.clone());
                session.bytes_per_second = 0.0;
                None
            });
    }

    fn progress(&self, sample: &ProgressSample) {
        let kind = self.kind;
        self.coordinator
            .update(&self.package_id, self.lease, |session| {
                // A fallback mirror restarts from zero; hold its samples until
                // it passes what was already reported.
                if sample.bytes_downloaded < session.bytes_downloaded {
                    return None;
                }
                if session.state.can_transition_to(SessionState::InProgress) {
                    session.state = SessionState::InProgress;
                }
                session.bytes_downloaded = sample.bytes_downloaded;
                session.total_bytes = sample.total_bytes;
                session.bytes_per_second = sample.bytes_per_second;
                Some(InstallEvent::progress(
                    &session.package_id,
                    kind,
                    &sample.mirror_name,
                    sample.bytes_downloaded,
                    sample.total_bytes,
                    sample.bytes_per_second,
                ))
            });
    }

    fn mirror_failed(&self, _index: usize, failure: &MirrorFailure) {
        let kind = self.kind;
        self.coordinator
            .update(&self.package_id, self.lease, |session| {
                session.last_error = Some(format!("{}: {}", failure.mirror, failure.reason));
                Some(InstallEvent::mirror_failed(&session.package_id, kind, failure))
            });
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if !self.finished {
            self.finish_with_error(&InstallError::other("session abandoned"));
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("package_id", &self.package_id)
            .field("kind", &self.kind)
            .field("lease", &self.lease)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::EventHub;
    use arcade_core::EventStatus;

    fn sample(bytes: u64) -> ProgressSample {
        ProgressSample {
            mirror_name: "Primary".to_string(),
            bytes_downloaded: bytes,
            total_bytes: Some(100),
            bytes_per_second: 10.0,
        }
    }

    #[test]
    fn test_progress_never_moves_backwards() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe();
        let coordinator = Arc::new(SessionCoordinator::new(Arc::new(hub)));
        let handle = coordinator
            .begin(&PackageId::from("a"), SessionKind::Install)
            .unwrap();

        handle.progress(&sample(40));
        handle.mirror_failed(0, &MirrorFailure::new("Primary", "https://p", "HTTP 500"));
        handle.progress(&sample(10));
        handle.progress(&sample(60));

        let bytes: Vec<_> = sub
            .drain()
            .into_iter()
            .filter(|e| e.status == EventStatus::Progress)
            .map(|e| e.bytes_downloaded)
            .collect();
        assert_eq!(bytes, vec![40, 60]);
        assert_eq!(handle.snapshot().unwrap().state, SessionState::InProgress);
    }

    #[test]
    fn test_drop_releases_as_failed() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe();
        let coordinator = Arc::new(SessionCoordinator::new(Arc::new(hub)));
        let id = PackageId::from("a");

        drop(coordinator.begin(&id, SessionKind::Install).unwrap());

        assert!(!coordinator.is_active(&id));
        let last = sub.drain().pop().unwrap();
        assert_eq!(last.status, EventStatus::Error);
        assert_eq!(last.message.as_deref(), Some("session abandoned"));
    }

    #[test]
    fn test_cancelled_failure_reports_cancelled() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe();
        let coordinator = Arc::new(SessionCoordinator::new(Arc::new(hub)));
        let handle = coordinator
            .begin(&PackageId::from("a"), SessionKind::Install)
            .unwrap();

        handle.fail(&InstallError::Cancelled);

        let last = sub.drain().pop().unwrap();
        assert_eq!(last.status, EventStatus::Cancelled);
    }

    #[test]
    fn test_extracting_after_progress() {
        let coordinator = Arc::new(SessionCoordinator::new(Arc::new(EventHub::new())));
        let handle = coordinator
            .begin(&PackageId::from("a"), SessionKind::Install)
            .unwrap();

        handle.progress(&sample(100));
        handle.extracting().unwrap();
        assert_eq!(handle.snapshot().unwrap().state, SessionState::Extracting);
        handle.complete(None, None);
    }
}
