//! Progress sample gating.

use std::time::{Duration, Instant};

/// Decides which per-chunk byte counts become progress samples.
///
/// A count passes when the interval has elapsed since the last count that
/// passed and the transfer moved forward since then. The first count always
/// passes.
#[derive(Debug)]
pub struct ProgressThrottle {
    min_interval: Duration,
    last: Option<(Instant, u64)>,
}

impl ProgressThrottle {
    /// Gate with `min_interval` between samples.
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Whether `downloaded` bytes should be reported now.
    pub fn admit(&mut self, downloaded: u64) -> bool {
        self.admit_at(Instant::now(), downloaded)
    }

    /// Whether `downloaded` bytes should be reported at `at`.
    pub fn admit_at(&mut self, at: Instant, downloaded: u64) -> bool {
        let pass = self.last.is_none_or(|(when, bytes)| {
            downloaded > bytes && at.saturating_duration_since(when) >= self.min_interval
        });
        if pass {
            self.last = Some((at, downloaded));
        }
        pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_count_passes() {
        let mut throttle = ProgressThrottle::new(Duration::from_secs(60));
        assert!(throttle.admit(64));
        assert!(!throttle.admit(128));
    }

    #[test]
    fn test_counts_inside_interval_are_dropped() {
        let start = Instant::now();
        let mut throttle = ProgressThrottle::new(Duration::from_millis(250));
        assert!(throttle.admit_at(start, 64));
        assert!(!throttle.admit_at(start + Duration::from_millis(100), 128));
        assert!(throttle.admit_at(start + Duration::from_millis(250), 192));
        assert!(!throttle.admit_at(start + Duration::from_millis(400), 256));
    }

    #[test]
    fn test_stalled_transfer_is_not_resampled() {
        let start = Instant::now();
        let mut throttle = ProgressThrottle::new(Duration::from_millis(250));
        assert!(throttle.admit_at(start, 64));
        assert!(!throttle.admit_at(start + Duration::from_secs(5), 64));
        assert!(throttle.admit_at(start + Duration::from_secs(6), 65));
    }

    #[test]
    fn test_zero_interval_passes_every_advance() {
        let start = Instant::now();
        let mut throttle = ProgressThrottle::new(Duration::ZERO);
        assert!(throttle.admit_at(start, 1));
        assert!(throttle.admit_at(start, 2));
        assert!(!throttle.admit_at(start, 2));
    }
}
