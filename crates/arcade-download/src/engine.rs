//! Mirror download engine.
//!
//! Streams one archive to a destination file, trying mirrors in priority
//! order (primaries first, then declaration order), each at most once per
//! call. Recoverable failures (connection errors, non-success statuses,
//! timeouts, truncated bodies) advance to the next mirror; anything else
//! ends the fetch. Partial data is removed before any error is returned.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use arcade_core::catalog::prioritize_mirrors;
use arcade_core::{InstallError, InstallResult, Mirror, MirrorFailure};

use crate::progress::{ProgressThrottle, SpeedWindow};
use crate::transport::MirrorTransport;

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Timeout for opening a transfer and for every gap between chunks.
    pub attempt_timeout: Duration,
    /// Minimum interval between progress samples.
    pub progress_interval: Duration,
    /// Window used for the instantaneous speed.
    pub speed_window: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(30),
            progress_interval: Duration::from_millis(250),
            speed_window: Duration::from_secs(3),
        }
    }
}

/// One progress sample from the current attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSample {
    /// Mirror being downloaded from.
    pub mirror_name: String,
    /// Bytes received in this attempt.
    pub bytes_downloaded: u64,
    /// Total bytes, when known.
    pub total_bytes: Option<u64>,
    /// Instantaneous speed.
    pub bytes_per_second: f64,
}

/// Receives attempt, progress and fallback notifications during a fetch.
///
/// Called inline from the download loop; implementations must not block.
pub trait FetchReporter: Send + Sync {
    /// A new mirror attempt is starting.
    fn attempt_started(&self, index: usize, mirror: &Mirror);

    /// Progress within the current attempt.
    fn progress(&self, sample: &ProgressSample);

    /// A mirror failed recoverably; the engine moves on.
    fn mirror_failed(&self, index: usize, failure: &MirrorFailure);
}

/// Reporter that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl FetchReporter for NoopReporter {
    fn attempt_started(&self, _index: usize, _mirror: &Mirror) {}
    fn progress(&self, _sample: &ProgressSample) {}
    fn mirror_failed(&self, _index: usize, _failure: &MirrorFailure) {}
}

/// Result of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Mirror that delivered the archive.
    pub mirror: Mirror,
    /// Index of that mirror in attempt order.
    pub mirror_index: usize,
    /// Bytes written.
    pub bytes: u64,
    /// Destination file.
    pub path: PathBuf,
    /// Failures of the mirrors tried before it.
    pub failures: Vec<MirrorFailure>,
}

impl FetchOutcome {
    /// Number of mirrors attempted, including the successful one.
    pub fn attempts(&self) -> usize {
        self.failures.len() + 1
    }
}

/// Downloads an archive with mirror fallback.
pub struct MirrorDownloadEngine {
    transport: Arc<dyn MirrorTransport>,
    config: EngineConfig,
}

impl MirrorDownloadEngine {
    /// Create an engine over a transport.
    pub fn new(transport: Arc<dyn MirrorTransport>, config: EngineConfig) -> Self {
        Self { transport, config }
    }

    /// Engine configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Download from the first mirror that succeeds into `dest`.
    ///
    /// Fails with `AllMirrorsExhausted` (carrying every reason in attempt
    /// order) when no mirror succeeds, `Cancelled` when `cancel` fires, or
    /// the first non-recoverable error (disk write failures).
    pub async fn fetch(
        &self,
        mirrors: &[Mirror],
        dest: &Path,
        cancel: &CancellationToken,
        reporter: &dyn FetchReporter,
    ) -> InstallResult<FetchOutcome> {
        let ordered = prioritize_mirrors(mirrors);
        let mut failures: Vec<MirrorFailure> = Vec::with_capacity(ordered.len());

        for (index, mirror) in ordered.into_iter().enumerate() {
            if cancel.is_cancelled() {
                remove_partial(dest).await;
                return Err(InstallError::Cancelled);
            }

            reporter.attempt_started(index, &mirror);
            tracing::info!(
                target: "arcade.download",
                mirror = %mirror.name,
                url = %mirror.url,
                attempt = index + 1,
                "Trying mirror"
            );

            match self.attempt(&mirror, dest, cancel, reporter).await {
                Ok(bytes) => {
                    tracing::info!(
                        target: "arcade.download",
                        mirror = %mirror.name,
                        bytes,
                        "Mirror transfer complete"
                    );
                    return Ok(FetchOutcome {
                        mirror,
                        mirror_index: index,
                        bytes,
                        path: dest.to_path_buf(),
                        failures,
                    });
                }
                Err(err) => {
                    remove_partial(dest).await;
                    if !err.is_recoverable() {
                        return Err(err);
                    }

                    let failure = MirrorFailure::new(&mirror.name, &mirror.url, failure_reason(&err));
                    tracing::warn!(
                        target: "arcade.download",
                        mirror = %mirror.name,
                        reason = %failure.reason,
                        "Mirror failed, trying next"
                    );
                    reporter.mirror_failed(index, &failure);
                    failures.push(failure);
                }
            }
        }

        Err(InstallError::AllMirrorsExhausted { failures })
    }

    async fn attempt(
        &self,
        mirror: &Mirror,
        dest: &Path,
        cancel: &CancellationToken,
        reporter: &dyn FetchReporter,
    ) -> InstallResult<u64> {
        let timeout = self.config.attempt_timeout;

        let transfer = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(InstallError::Cancelled),
            opened = tokio::time::timeout(timeout, self.transport.open(mirror)) => {
                opened.map_err(|_| timed_out(mirror, timeout))??
            }
        };

        let announced = transfer.content_length;
        let total = announced.or(mirror.size_bytes);
        let mut body = transfer.body;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| write_error(&e, total))?;
        let mut throttle = ProgressThrottle::new(self.config.progress_interval);
        let mut speed = SpeedWindow::new(self.config.speed_window);
        let mut downloaded: u64 = 0;

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(InstallError::Cancelled),
                next = tokio::time::timeout(timeout, body.next()) => {
                    next.map_err(|_| stalled(mirror, timeout, downloaded))?
                }
            };

            let Some(chunk) = next else { break };
            let chunk = chunk?;

            file.write_all(&chunk)
                .await
                .map_err(|e| write_error(&e, total))?;
            downloaded += chunk.len() as u64;
            speed.record(chunk.len() as u64);

            if throttle.admit(downloaded) {
                reporter.progress(&ProgressSample {
                    mirror_name: mirror.name.clone(),
                    bytes_downloaded: downloaded,
                    total_bytes: total,
                    bytes_per_second: speed.bytes_per_second(),
                });
            }
        }

        file.flush().await.map_err(|e| write_error(&e, total))?;
        drop(file);

        // Manifest sizes are human estimates; only a server-announced length is binding.
        if let Some(expected) = announced {
            if downloaded < expected {
                return Err(InstallError::network(
                    &mirror.name,
                    format!("truncated transfer: received {downloaded} of {expected} bytes"),
                ));
            }
        }

        reporter.progress(&ProgressSample {
            mirror_name: mirror.name.clone(),
            bytes_downloaded: downloaded,
            total_bytes: Some(total.unwrap_or(downloaded).max(downloaded)),
            bytes_per_second: speed.bytes_per_second(),
        });

        Ok(downloaded)
    }
}

fn timed_out(mirror: &Mirror, timeout: Duration) -> InstallError {
    InstallError::network(
        &mirror.name,
        format!("timed out after {}s", timeout.as_secs_f32()),
    )
}

fn stalled(mirror: &Mirror, timeout: Duration, received: u64) -> InstallError {
    InstallError::network(
        &mirror.name,
        format!(
            "stalled for {}s after {received} bytes",
            timeout.as_secs_f32()
        ),
    )
}

fn write_error(err: &std::io::Error, total: Option<u64>) -> InstallError {
    if err.kind() == std::io::ErrorKind::StorageFull {
        return InstallError::DiskSpace {
            required: total.unwrap_or_default(),
            available: 0,
        };
    }
    InstallError::io_context("writing download", err)
}

/// Reason recorded for a failed mirror (without repeating the mirror name).
fn failure_reason(err: &InstallError) -> String {
    match err {
        InstallError::Network { message, .. } => message.clone(),
        InstallError::HttpStatus { status, .. } => format!("HTTP {status}"),
        other => other.to_string(),
    }
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(target: "arcade.download", path = %path.display(), "Removed partial download");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                target: "arcade.download",
                path = %path.display(),
                error = %e,
                "Failed to remove partial download"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_strips_mirror_name() {
        assert_eq!(
            failure_reason(&InstallError::http_status("Primary", 503)),
            "HTTP 503"
        );
        assert_eq!(
            failure_reason(&InstallError::network("Primary", "timed out after 1s")),
            "timed out after 1s"
        );
    }

    #[test]
    fn test_storage_full_maps_to_disk_space() {
        let err = std::io::Error::from(std::io::ErrorKind::StorageFull);
        assert!(matches!(
            write_error(&err, Some(10)),
            InstallError::DiskSpace { required: 10, .. }
        ));
    }

    #[test]
    fn test_outcome_counts_attempts() {
        let outcome = FetchOutcome {
            mirror: Mirror::new("b", "https://b.example"),
            mirror_index: 1,
            bytes: 1,
            path: PathBuf::from("/tmp/x"),
            failures: vec![MirrorFailure::new("a", "https://a.example", "HTTP 500")],
        };
        assert_eq!(outcome.attempts(), 2);
    }
}
