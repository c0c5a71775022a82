//! Launcher settings and validation.
//!
//! Settings are persisted as `settings.json` in the data root. All fields are
//! optional so partial files keep working; `effective_*` accessors apply the
//! defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-attempt timeout (connect and every gap between chunks).
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 30;

/// Default minimum interval between progress events.
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 250;

/// Default interval between connectivity probes.
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 30;

/// Default free space required, as a percentage of the declared archive size.
pub const DEFAULT_EXTRACTION_SPACE_PERCENT: u32 = 250;

/// Default retry count for manifest requests.
pub const DEFAULT_MANIFEST_RETRIES: u8 = 2;

/// Launcher settings structure.
///
/// All fields are optional to support partial updates and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LauncherSettings {
    /// Install root override.
    pub install_root: Option<String>,

    /// Manifest URL (or local path).
    pub manifest_url: Option<String>,

    /// Per-attempt mirror timeout in seconds (1-600).
    pub attempt_timeout_secs: Option<u64>,

    /// Minimum interval between progress events in milliseconds (50-5000).
    pub progress_interval_ms: Option<u64>,

    /// Interval between connectivity probes in seconds (5-3600).
    pub probe_interval_secs: Option<u64>,

    /// Free space required before a download, as a percentage of the archive size (100-1000).
    pub extraction_space_percent: Option<u32>,

    /// Retries for manifest requests (0-10).
    pub manifest_retries: Option<u8>,
}

impl LauncherSettings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self {
            install_root: None,
            manifest_url: None,
            attempt_timeout_secs: Some(DEFAULT_ATTEMPT_TIMEOUT_SECS),
            progress_interval_ms: Some(DEFAULT_PROGRESS_INTERVAL_MS),
            probe_interval_secs: Some(DEFAULT_PROBE_INTERVAL_SECS),
            extraction_space_percent: Some(DEFAULT_EXTRACTION_SPACE_PERCENT),
            manifest_retries: Some(DEFAULT_MANIFEST_RETRIES),
        }
    }

    /// Get the effective per-attempt timeout.
    #[must_use]
    pub const fn effective_attempt_timeout(&self) -> Duration {
        match self.attempt_timeout_secs {
            Some(secs) => Duration::from_secs(secs),
            None => Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECS),
        }
    }

    /// Get the effective progress interval.
    #[must_use]
    pub const fn effective_progress_interval(&self) -> Duration {
        match self.progress_interval_ms {
            Some(ms) => Duration::from_millis(ms),
            None => Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS),
        }
    }

    /// Get the effective probe interval.
    #[must_use]
    pub const fn effective_probe_interval(&self) -> Duration {
        match self.probe_interval_secs {
            Some(secs) => Duration::from_secs(secs),
            None => Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
        }
    }

    /// Get the effective extraction space percentage.
    #[must_use]
    pub const fn effective_extraction_space_percent(&self) -> u32 {
        match self.extraction_space_percent {
            Some(percent) => percent,
            None => DEFAULT_EXTRACTION_SPACE_PERCENT,
        }
    }

    /// Get the effective manifest retry count.
    #[must_use]
    pub const fn effective_manifest_retries(&self) -> u8 {
        match self.manifest_retries {
            Some(retries) => retries,
            None => DEFAULT_MANIFEST_RETRIES,
        }
    }

    /// Merge another settings into this one, only updating fields that are Some.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(ref root) = other.install_root {
            self.install_root.clone_from(root);
        }
        if let Some(ref url) = other.manifest_url {
            self.manifest_url.clone_from(url);
        }
        if let Some(timeout) = other.attempt_timeout_secs {
            self.attempt_timeout_secs = timeout;
        }
        if let Some(interval) = other.progress_interval_ms {
            self.progress_interval_ms = interval;
        }
        if let Some(interval) = other.probe_interval_secs {
            self.probe_interval_secs = interval;
        }
        if let Some(percent) = other.extraction_space_percent {
            self.extraction_space_percent = percent;
        }
        if let Some(retries) = other.manifest_retries {
            self.manifest_retries = retries;
        }
    }

    /// Load settings from a JSON file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::with_defaults());
            }
            Err(e) => return Err(SettingsError::Io(e.to_string())),
        };

        let settings: Self =
            serde_json::from_str(&contents).map_err(|e| SettingsError::Parse(e.to_string()))?;
        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Save settings to a JSON file, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        validate_settings(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io(e.to_string()))?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| SettingsError::Io(e.to_string()))
    }
}

/// Partial settings update.
///
/// Each field is `Option<Option<T>>`:
/// - `None` = don't change this field
/// - `Some(None)` = reset field to its default
/// - `Some(Some(value))` = set field to value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub install_root: Option<Option<String>>,
    pub manifest_url: Option<Option<String>>,
    pub attempt_timeout_secs: Option<Option<u64>>,
    pub progress_interval_ms: Option<Option<u64>>,
    pub probe_interval_secs: Option<Option<u64>>,
    pub extraction_space_percent: Option<Option<u32>>,
    pub manifest_retries: Option<Option<u8>>,
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Attempt timeout must be between 1 and 600 seconds, got {0}")]
    InvalidAttemptTimeout(u64),

    #[error("Progress interval must be between 50 and 5000 ms, got {0}")]
    InvalidProgressInterval(u64),

    #[error("Probe interval must be between 5 and 3600 seconds, got {0}")]
    InvalidProbeInterval(u64),

    #[error("Extraction space must be between 100% and 1000% of the archive size, got {0}%")]
    InvalidExtractionSpace(u32),

    #[error("Manifest retries must be at most 10, got {0}")]
    InvalidManifestRetries(u8),

    #[error("Install root cannot be empty")]
    EmptyInstallRoot,

    #[error("Manifest URL cannot be empty")]
    EmptyManifestUrl,

    #[error("Failed to read settings: {0}")]
    Io(String),

    #[error("Invalid settings file: {0}")]
    Parse(String),
}

/// Validate settings values.
pub fn validate_settings(settings: &LauncherSettings) -> Result<(), SettingsError> {
    if let Some(secs) = settings.attempt_timeout_secs {
        if !(1..=600).contains(&secs) {
            return Err(SettingsError::InvalidAttemptTimeout(secs));
        }
    }

    if let Some(ms) = settings.progress_interval_ms {
        if !(50..=5000).contains(&ms) {
            return Err(SettingsError::InvalidProgressInterval(ms));
        }
    }

    if let Some(secs) = settings.probe_interval_secs {
        if !(5..=3600).contains(&secs) {
            return Err(SettingsError::InvalidProbeInterval(secs));
        }
    }

    if let Some(percent) = settings.extraction_space_percent {
        if !(100..=1000).contains(&percent) {
            return Err(SettingsError::InvalidExtractionSpace(percent));
        }
    }

    if let Some(retries) = settings.manifest_retries {
        if retries > 10 {
            return Err(SettingsError::InvalidManifestRetries(retries));
        }
    }

    if settings
        .install_root
        .as_ref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(SettingsError::EmptyInstallRoot);
    }

    if settings
        .manifest_url
        .as_ref()
        .is_some_and(|u| u.trim().is_empty())
    {
        return Err(SettingsError::EmptyManifestUrl);
    }

    Ok(())
}
