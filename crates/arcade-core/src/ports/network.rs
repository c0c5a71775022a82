//! Network probe port.
//!
//! The probe is read-only with respect to sessions: it never cancels or
//! pauses an operation, it only informs the manifest provider and presentation.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Connectivity as last observed by the probe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkStatus {
    /// No probe has completed yet.
    #[default]
    Unknown,
    /// Last probe succeeded.
    Online,
    /// Last probe failed.
    Offline,
}

impl NetworkStatus {
    /// Whether remote requests are worth attempting.
    #[must_use]
    pub const fn may_be_online(&self) -> bool {
        !matches!(self, Self::Offline)
    }
}

/// Port for observing connectivity.
pub trait NetworkProbePort: Send + Sync {
    /// Current connectivity.
    fn status(&self) -> NetworkStatus;

    /// Subscribe to connectivity changes.
    fn subscribe(&self) -> watch::Receiver<NetworkStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    mockall::mock! {
        Probe {}
        impl NetworkProbePort for Probe {
            fn status(&self) -> NetworkStatus;
            fn subscribe(&self) -> watch::Receiver<NetworkStatus>;
        }
    }

    #[test]
    fn test_unknown_is_treated_as_possibly_online() {
        assert!(NetworkStatus::Unknown.may_be_online());
        assert!(NetworkStatus::Online.may_be_online());
        assert!(!NetworkStatus::Offline.may_be_online());
    }

    #[test]
    fn test_probe_port_is_object_safe() {
        let mut probe = MockProbe::new();
        probe.expect_status().return_const(NetworkStatus::Offline);
        let probe: Box<dyn NetworkProbePort> = Box::new(probe);
        assert_eq!(probe.status(), NetworkStatus::Offline);
    }
}
