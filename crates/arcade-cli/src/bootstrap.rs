//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - Data root, settings and install root resolution
//! - Manifest provider (HTTP with cache and probe, or a local file)
//! - Installed-state registry and mirror transport
//! - The [`Launcher`] orchestrator
//!
//! Command handlers receive the composed context and delegate to the launcher.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use url::Url;

use arcade_core::{
    InstalledStateRepositoryPort, LauncherSettings, ManifestProviderPort, ResolvedPaths,
    data_root, paths::ensure_directory, resolve_install_root,
};
use arcade_download::{EngineConfig, MirrorTransport, ReqwestTransport};
use arcade_install::{DiskBudget, JsonInstallRegistry, Launcher, LauncherDeps};
use arcade_manifest::{
    DEFAULT_MANIFEST_URL, FileManifestProvider, HttpManifestProvider, HttpNetworkProbe,
    ManifestCache, ManifestClientConfig, ReqwestBackend,
};

use crate::error::CliError;

/// Bootstrap configuration for the CLI.
///
/// Every field overrides the persisted settings when present.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Launcher data directory.
    pub data_dir: Option<PathBuf>,
    /// Install root.
    pub install_root: Option<PathBuf>,
    /// Manifest URL or local manifest path.
    pub manifest: Option<String>,
}

impl CliConfig {
    /// Config with no overrides.
    pub fn with_defaults() -> Self {
        Self::default()
    }
}

/// Where the catalog comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLocation {
    /// Remote manifest, cached for offline use.
    Remote(Url),
    /// Manifest file on disk.
    File(PathBuf),
}

impl ManifestLocation {
    /// Interpret `raw` as an http(s) URL, or else as a file path.
    pub fn parse(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Remote(url),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_or_else(|()| Self::File(PathBuf::from(raw)), Self::File),
            _ => Self::File(PathBuf::from(raw)),
        }
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    /// The orchestrator.
    pub launcher: Launcher,
    /// Effective settings.
    pub settings: LauncherSettings,
    /// Catalog location in use.
    pub manifest: ManifestLocation,
    probe_cancel: CancellationToken,
}

impl CliContext {
    /// Access the launcher.
    pub const fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    /// Access the resolved paths.
    pub const fn paths(&self) -> &ResolvedPaths {
        self.launcher.paths()
    }

    /// Access the effective settings.
    pub const fn settings(&self) -> &LauncherSettings {
        &self.settings
    }

    /// Access the manifest location.
    pub const fn manifest(&self) -> &ManifestLocation {
        &self.manifest
    }
}

impl Drop for CliContext {
    fn drop(&mut self) {
        self.probe_cancel.cancel();
    }
}

/// Resolve the directory layout and load settings without building the launcher.
pub fn resolve_layout(config: &CliConfig) -> Result<(ResolvedPaths, LauncherSettings), CliError> {
    let data_root = match &config.data_dir {
        Some(dir) => {
            ensure_directory(dir)?;
            dir.clone()
        }
        None => data_root()?,
    };
    let settings = LauncherSettings::load(&data_root.join("settings.json"))?;

    let install_root = match &config.install_root {
        Some(root) => root.clone(),
        None => resolve_install_root(settings.install_root.as_deref())?,
    };
    ensure_directory(&install_root)?;

    Ok((ResolvedPaths::from_roots(&data_root, &install_root), settings))
}

/// Bootstrap the CLI application.
///
/// This is the composition root. It:
/// 1. Resolves the data root, settings and install root
/// 2. Builds the manifest provider for the configured location
/// 3. Creates the registry and mirror transport
/// 4. Assembles the launcher
pub async fn bootstrap(config: CliConfig) -> Result<CliContext> {
    // 1. Layout and settings
    let (paths, settings) = resolve_layout(&config)?;

    // 2. Manifest provider
    let raw_manifest = config
        .manifest
        .clone()
        .or_else(|| settings.manifest_url.clone())
        .unwrap_or_else(|| DEFAULT_MANIFEST_URL.to_string());
    let manifest = ManifestLocation::parse(&raw_manifest);
    let probe_cancel = CancellationToken::new();
    let provider = manifest_provider(&manifest, &paths, &settings, &probe_cancel)?;

    // 3. Registry and transport
    let registry: Arc<dyn InstalledStateRepositoryPort> =
        Arc::new(JsonInstallRegistry::new(&paths.registry_path));
    let transport: Arc<dyn MirrorTransport> = Arc::new(
        ReqwestTransport::new(settings.effective_attempt_timeout())
            .map_err(CliError::from)
            .context("Failed to create HTTP client")?,
    );

    // 4. Launcher
    let launcher = Launcher::new(LauncherDeps {
        paths: paths.clone(),
        transport,
        engine: EngineConfig {
            attempt_timeout: settings.effective_attempt_timeout(),
            progress_interval: settings.effective_progress_interval(),
            ..EngineConfig::default()
        },
        manifest: provider,
        registry,
        disk: DiskBudget::system(),
        space_percent: settings.effective_extraction_space_percent(),
    });

    tracing::debug!(paths = %paths, manifest = ?manifest, "CLI bootstrapped");
    Ok(CliContext {
        launcher,
        settings,
        manifest,
        probe_cancel,
    })
}

fn manifest_provider(
    location: &ManifestLocation,
    paths: &ResolvedPaths,
    settings: &LauncherSettings,
    probe_cancel: &CancellationToken,
) -> Result<Arc<dyn ManifestProviderPort>> {
    match location {
        ManifestLocation::File(path) => Ok(Arc::new(FileManifestProvider::new(path.clone()))),
        ManifestLocation::Remote(url) => {
            let client = ManifestClientConfig::new(url.as_str())
                .with_max_retries(settings.effective_manifest_retries());
            let backend = ReqwestBackend::new(&client).context("Failed to create HTTP client")?;
            let probe_backend = ReqwestBackend::new(&client.clone().with_max_retries(0))
                .context("Failed to create HTTP client")?;

            let probe = Arc::new(HttpNetworkProbe::new(
                probe_backend,
                url.clone(),
                settings.effective_probe_interval(),
            ));
            Arc::clone(&probe).spawn(probe_cancel.clone());

            let provider = HttpManifestProvider::new(
                backend,
                url.clone(),
                ManifestCache::new(&paths.manifest_cache_path),
            )
            .with_probe(probe);
            Ok(Arc::new(provider))
        }
    }
}

/// Display form of a manifest location.
pub fn describe(location: &ManifestLocation) -> String {
    match location {
        ManifestLocation::Remote(url) => url.to_string(),
        ManifestLocation::File(path) => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_location_parse() {
        assert_eq!(
            ManifestLocation::parse("https://cdn.example/manifest.json"),
            ManifestLocation::Remote(Url::parse("https://cdn.example/manifest.json").unwrap())
        );
        assert_eq!(
            ManifestLocation::parse("./manifest.json"),
            ManifestLocation::File(PathBuf::from("./manifest.json"))
        );
        assert_eq!(
            ManifestLocation::parse("/srv/arcade/manifest.json"),
            ManifestLocation::File(PathBuf::from("/srv/arcade/manifest.json"))
        );
    }

    #[test]
    fn test_resolve_layout_honors_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let config = CliConfig {
            data_dir: Some(tmp.path().join("data")),
            install_root: Some(tmp.path().join("games")),
            manifest: None,
        };

        let (paths, settings) = resolve_layout(&config).unwrap();
        assert_eq!(paths.data_root, tmp.path().join("data"));
        assert_eq!(paths.install_root, tmp.path().join("games"));
        assert_eq!(paths.registry_path, tmp.path().join("data/installed.json"));
        assert!(paths.install_root.is_dir());
        assert_eq!(settings, LauncherSettings::with_defaults());
    }

    #[test]
    fn test_resolve_layout_rejects_invalid_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("settings.json"), r#"{"attempt_timeout_secs": 0}"#).unwrap();

        let config = CliConfig {
            data_dir: Some(data),
            install_root: Some(tmp.path().join("games")),
            manifest: None,
        };
        let err = resolve_layout(&config).unwrap_err();
        assert_eq!(err.exit_code(), 78);
    }

    #[test]
    fn test_bootstrap_with_file_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let config = CliConfig {
            data_dir: Some(tmp.path().join("data")),
            install_root: Some(tmp.path().join("games")),
            manifest: Some(tmp.path().join("manifest.json").display().to_string()),
        };

        let ctx = tokio_test::block_on(bootstrap(config)).unwrap();
        assert!(matches!(ctx.manifest(), ManifestLocation::File(_)));
        assert_eq!(ctx.paths().install_root, tmp.path().join("games"));
    }
}
