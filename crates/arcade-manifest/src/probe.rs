//! Periodic network probe.
//!
//! Publishes online/offline through a watch channel. The probe only observes
//! connectivity; it never touches running sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use arcade_core::{NetworkProbePort, NetworkStatus};

use crate::http::HttpBackend;

/// Checks reachability of a URL on an interval.
pub struct HttpNetworkProbe<B: HttpBackend> {
    backend: B,
    target: Url,
    interval: Duration,
    status: watch::Sender<NetworkStatus>,
}

impl<B: HttpBackend + 'static> HttpNetworkProbe<B> {
    /// Probe `target` every `interval`. The status starts as `Unknown`.
    pub fn new(backend: B, target: Url, interval: Duration) -> Self {
        let (status, _) = watch::channel(NetworkStatus::Unknown);
        Self {
            backend,
            target,
            interval,
            status,
        }
    }

    /// Run one check and publish the result.
    pub async fn check_now(&self) -> NetworkStatus {
        let next = match self.backend.reachable(&self.target).await {
            Ok(()) => NetworkStatus::Online,
            Err(e) => {
                tracing::debug!(url = %self.target, error = %e, "Network probe failed");
                NetworkStatus::Offline
            }
        };

        let previous = self.status.send_replace(next);
        if previous != next {
            tracing::info!(from = ?previous, to = ?next, "Network status changed");
        }
        next
    }

    /// Check on the configured interval until `cancel` fires.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.check_now().await;
                    }
                }
            }
        })
    }
}

impl<B: HttpBackend> NetworkProbePort for HttpNetworkProbe<B> {
    fn status(&self) -> NetworkStatus {
        *self.status.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.status.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{CannedResponse, FakeBackend};

    const TARGET: &str = "https://games.example/manifest.json";

    #[tokio::test]
    async fn test_status_follows_reachability() {
        let backend = FakeBackend::new().with_response(TARGET, CannedResponse::Body(String::new()));
        let probe = HttpNetworkProbe::new(
            backend.clone(),
            Url::parse(TARGET).unwrap(),
            Duration::from_secs(30),
        );
        assert_eq!(probe.status(), NetworkStatus::Unknown);

        assert_eq!(probe.check_now().await, NetworkStatus::Online);

        backend.set(TARGET, CannedResponse::Offline);
        let mut rx = probe.subscribe();
        assert_eq!(probe.check_now().await, NetworkStatus::Offline);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), NetworkStatus::Offline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_probe_stops_on_cancel() {
        let backend = FakeBackend::new().with_response(TARGET, CannedResponse::Body(String::new()));
        let probe = Arc::new(HttpNetworkProbe::new(
            backend.clone(),
            Url::parse(TARGET).unwrap(),
            Duration::from_secs(5),
        ));
        let cancel = CancellationToken::new();

        let task = Arc::clone(&probe).spawn(cancel.clone());
        tokio::time::sleep(Duration::from_secs(11)).await;
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(probe.status(), NetworkStatus::Online);
        assert_eq!(backend.requests(), 3);
    }
}
