//! Sliding-window transfer speed.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Floor for the measurement span so the first chunk does not read as infinite speed.
const MIN_SPAN: Duration = Duration::from_millis(50);

/// Instantaneous speed over the most recent `window` of samples.
#[derive(Debug)]
pub struct SpeedWindow {
    window: Duration,
    started: Option<Instant>,
    samples: VecDeque<(Instant, u64)>,
}

impl SpeedWindow {
    /// Create a window of the given length.
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            started: None,
            samples: VecDeque::new(),
        }
    }

    /// Record `bytes` received now.
    pub fn record(&mut self, bytes: u64) {
        self.record_at(Instant::now(), bytes);
    }

    /// Record `bytes` received at `at`.
    pub fn record_at(&mut self, at: Instant, bytes: u64) {
        self.started.get_or_insert(at);
        self.samples.push_back((at, bytes));
        if let Some(cutoff) = at.checked_sub(self.window) {
            while self.samples.front().is_some_and(|(t, _)| *t < cutoff) {
                self.samples.pop_front();
            }
        }
    }

    /// Current speed in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        self.rate_at(Instant::now())
    }

    /// Speed in bytes per second as seen at `now`.
    #[allow(clippy::cast_precision_loss)]
    pub fn rate_at(&self, now: Instant) -> f64 {
        let Some(started) = self.started else {
            return 0.0;
        };

        let cutoff = now.checked_sub(self.window);
        let bytes: u64 = self
            .samples
            .iter()
            .filter(|(t, _)| cutoff.is_none_or(|c| *t >= c))
            .map(|(_, b)| b)
            .sum();

        let span = now.duration_since(started).min(self.window).max(MIN_SPAN);
        bytes as f64 / span.as_secs_f64()
    }
}
