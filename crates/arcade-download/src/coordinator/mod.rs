//! Session coordination.
//!
//! The coordinator admits at most one live session per package, hands out a
//! [`SessionHandle`] that drives the session through its state machine, and
//! publishes every transition and progress sample through the configured
//! emitter. Emission happens while the session table is locked so events for
//! one package are observed in transition order.

mod handle;
mod hub;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use arcade_core::{
    DownloadSession, InstallError, InstallEvent, InstallEventEmitterPort, InstallResult,
    PackageId, SessionKind, SessionState,
};

pub use handle::SessionHandle;
pub use hub::{EventHub, EventSubscription};

struct ActiveSession {
    lease: u64,
    cancel: CancellationToken,
    session: DownloadSession,
}

/// Serializes operations per package and broadcasts their events.
pub struct SessionCoordinator {
    sessions: Mutex<HashMap<PackageId, ActiveSession>>,
    next_lease: AtomicU64,
    emitter: Arc<dyn InstallEventEmitterPort>,
}

impl SessionCoordinator {
    /// Create a coordinator that publishes through `emitter`.
    pub fn new(emitter: Arc<dyn InstallEventEmitterPort>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_lease: AtomicU64::new(1),
            emitter,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PackageId, ActiveSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit a new session for `package_id`.
    ///
    /// Fails with `AlreadyInProgress` when a session for the package is live;
    /// the existing session is not touched.
    pub fn begin(
        self: &Arc<Self>,
        package_id: &PackageId,
        kind: SessionKind,
    ) -> InstallResult<SessionHandle> {
        let mut sessions = self.lock();
        if let Some(active) = sessions.get(package_id) {
            tracing::debug!(
                target: "arcade.download",
                package_id = %package_id,
                active_kind = %active.session.kind,
                "Rejected concurrent session"
            );
            return Err(InstallError::already_in_progress(package_id));
        }

        let lease = self.next_lease.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let mut session = DownloadSession::new(package_id.clone(), kind);
        session.state = SessionState::Started;

        sessions.insert(
            package_id.clone(),
            ActiveSession {
                lease,
                cancel: cancel.clone(),
                session,
            },
        );
        self.emitter.emit(InstallEvent::started(package_id, kind));
        drop(sessions);

        tracing::info!(
            target: "arcade.download",
            package_id = %package_id,
            kind = %kind,
            lease,
            "Session started"
        );

        Ok(SessionHandle::new(
            Arc::clone(self),
            package_id.clone(),
            kind,
            lease,
            cancel,
        ))
    }

    /// Request cancellation of the live session for `package_id`.
    ///
    /// Cancellation is cooperative; the session reports `Cancelled` once its
    /// worker has cleaned up.
    pub fn cancel(&self, package_id: &PackageId) -> InstallResult<()> {
        let sessions = self.lock();
        let active = sessions
            .get(package_id)
            .ok_or_else(|| InstallError::no_active_session(package_id))?;
        active.cancel.cancel();
        tracing::info!(target: "arcade.download", package_id = %package_id, "Cancellation requested");
        Ok(())
    }

    /// Request cancellation of every live session. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let sessions = self.lock();
        for active in sessions.values() {
            active.cancel.cancel();
        }
        sessions.len()
    }

    /// Copy of every live session, ordered by package id.
    pub fn snapshot(&self) -> Vec<DownloadSession> {
        let mut sessions: Vec<_> = self.lock().values().map(|a| a.session.clone()).collect();
        sessions.sort_by(|a, b| a.package_id.as_str().cmp(b.package_id.as_str()));
        sessions
    }

    /// Copy of the live session for `package_id`.
    pub fn session(&self, package_id: &PackageId) -> Option<DownloadSession> {
        self.lock().get(package_id).map(|a| a.session.clone())
    }

    /// Whether `package_id` has a live session.
    pub fn is_active(&self, package_id: &PackageId) -> bool {
        self.lock().contains_key(package_id)
    }

    /// Number of live sessions.
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Mutate the session owned by `lease` and emit whatever event `f` returns.
    pub(crate) fn update<F>(&self, package_id: &PackageId, lease: u64, f: F)
    where
        F: FnOnce(&mut DownloadSession) -> Option<InstallEvent>,
    {
        let mut sessions = self.lock();
        let Some(active) = sessions.get_mut(package_id).filter(|a| a.lease == lease) else {
            return;
        };
        if let Some(event) = f(&mut active.session) {
            self.emitter.emit(event);
        }
    }

    /// Move a live session to a non-terminal state and emit `event`.
    pub(crate) fn transition(
        &self,
        package_id: &PackageId,
        lease: u64,
        next: SessionState,
        event: impl FnOnce(&DownloadSession) -> InstallEvent,
    ) -> InstallResult<()> {
        let mut sessions = self.lock();
        let active = sessions
            .get_mut(package_id)
            .filter(|a| a.lease == lease)
            .ok_or_else(|| InstallError::no_active_session(package_id))?;

        let current = active.session.state;
        if !current.can_transition_to(next) {
            return Err(InstallError::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        active.session.state = next;
        self.emitter.emit(event(&active.session));
        Ok(())
    }

    /// Remove the session owned by `lease`, emitting its terminal event.
    pub(crate) fn release(
        &self,
        package_id: &PackageId,
        lease: u64,
        final_state: SessionState,
        event: InstallEvent,
    ) {
        let mut sessions = self.lock();
        let owned = sessions.get(package_id).is_some_and(|a| a.lease == lease);
        if !owned {
            tracing::warn!(
                target: "arcade.download",
                package_id = %package_id,
                lease,
                "Stale session release ignored"
            );
            return;
        }
        sessions.remove(package_id);
        self.emitter.emit(event);
        drop(sessions);

        tracing::info!(
            target: "arcade.download",
            package_id = %package_id,
            state = %final_state,
            "Session ended"
        );
    }
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("active", &self.active_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::{EventStatus, NoopInstallEmitter};

    fn coordinator() -> (Arc<SessionCoordinator>, EventSubscription) {
        let hub = EventHub::new();
        let sub = hub.subscribe();
        (Arc::new(SessionCoordinator::new(Arc::new(hub))), sub)
    }

    #[test]
    fn test_begin_rejects_second_session() {
        let (coordinator, _sub) = coordinator();
        let id = PackageId::from("stellar_quest");

        let _first = coordinator.begin(&id, SessionKind::Install).unwrap();
        let err = coordinator.begin(&id, SessionKind::Update).unwrap_err();

        assert!(matches!(err, InstallError::AlreadyInProgress { .. }));
        let session = coordinator.session(&id).unwrap();
        assert_eq!(session.kind, SessionKind::Install);
        assert_eq!(session.state, SessionState::Started);
    }

    #[test]
    fn test_cancel_without_session() {
        let coordinator = SessionCoordinator::new(Arc::new(NoopInstallEmitter::new()));
        let err = coordinator.cancel(&PackageId::from("nope")).unwrap_err();
        assert!(matches!(err, InstallError::NoActiveSession { .. }));
    }

    #[test]
    fn test_complete_frees_slot_and_emits() {
        let (coordinator, mut sub) = coordinator();
        let id = PackageId::from("a");

        let handle = coordinator.begin(&id, SessionKind::Install).unwrap();
        handle.complete(None, None);

        assert!(!coordinator.is_active(&id));
        let statuses: Vec<_> = sub.drain().into_iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec![EventStatus::Started, EventStatus::Completed]);
        assert!(coordinator.begin(&id, SessionKind::Install).is_ok());
    }

    #[test]
    fn test_stale_lease_cannot_release_newer_session() {
        let (coordinator, _sub) = coordinator();
        let id = PackageId::from("a");

        let first = coordinator.begin(&id, SessionKind::Install).unwrap();
        let stale_lease = first.lease();
        first.complete(None, None);

        let _second = coordinator.begin(&id, SessionKind::Install).unwrap();
        coordinator.release(
            &id,
            stale_lease,
            SessionState::Failed,
            InstallEvent::error(&id, SessionKind::Install, "stale"),
        );
        assert!(coordinator.is_active(&id));
    }

    #[test]
    fn test_cancel_all_signals_every_session() {
        let (coordinator, _sub) = coordinator();
        let a = coordinator.begin(&PackageId::from("a"), SessionKind::Install).unwrap();
        let b = coordinator.begin(&PackageId::from("b"), SessionKind::Repair).unwrap();

        assert_eq!(coordinator.cancel_all(), 2);
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let (coordinator, _sub) = coordinator();
        let _b = coordinator.begin(&PackageId::from("b"), SessionKind::Install).unwrap();
        let _a = coordinator.begin(&PackageId::from("a"), SessionKind::Install).unwrap();

        let ids: Vec<_> = coordinator
            .snapshot()
            .into_iter()
            .map(|s| s.package_id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_transition_is_rejected() {
        let (coordinator, _sub) = coordinator();
        let id = PackageId::from("a");
        let handle = coordinator.begin(&id, SessionKind::Install).unwrap();

        let err = coordinator
            .transition(&id, handle.lease(), SessionState::Started, |s| {
                InstallEvent::started(&s.package_id, s.kind)
            })
            .unwrap_err();
        assert!(matches!(err, InstallError::InvalidTransition { .. }));
    }
}
