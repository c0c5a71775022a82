//! Orchestrator facade used by presentation.
//!
//! Commands that change an install (`install`, `update`, `repair`,
//! `restore`) are admitted through the session coordinator and run on their
//! own tokio task; the caller gets an [`OperationHandle`] back immediately
//! and follows progress through [`Launcher::subscribe`].

use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::task::JoinHandle;

use arcade_core::{
    BackupSnapshot, CatalogEntry, CatalogSource, DownloadSession, EntryStatus, InstallError,
    InstallResult, InstalledRecord, InstalledStateRepositoryPort, ManifestError,
    ManifestProviderPort, PackageId, ResolvedPaths, SessionKind,
};
use arcade_download::{
    EngineConfig, EventHub, EventSubscription, MirrorDownloadEngine, MirrorTransport,
    SessionCoordinator, SessionHandle,
};

use crate::disk::DiskBudget;
use crate::installer::{DEFAULT_SPACE_PERCENT, PackageInstaller};
use crate::pipeline::InstalledPaths;
use crate::reconcile::{ScanReconciler, ScanReport};
use crate::repair::{RepairEngine, RepairReport};
use crate::store::CatalogStore;
use crate::update::{UpdateCheck, UpdateManager};

/// Everything the launcher is assembled from.
pub struct LauncherDeps {
    /// Resolved directory layout.
    pub paths: ResolvedPaths,
    /// Mirror transport.
    pub transport: Arc<dyn MirrorTransport>,
    /// Download engine tuning.
    pub engine: EngineConfig,
    /// Catalog source.
    pub manifest: Arc<dyn ManifestProviderPort>,
    /// Installed-state persistence.
    pub registry: Arc<dyn InstalledStateRepositoryPort>,
    /// Shared free-space ledger.
    pub disk: DiskBudget,
    /// Extraction headroom as a percentage of archive size.
    pub space_percent: u32,
}

impl LauncherDeps {
    /// Deps with default engine tuning, system disk checks and default headroom.
    pub fn new(
        paths: ResolvedPaths,
        transport: Arc<dyn MirrorTransport>,
        manifest: Arc<dyn ManifestProviderPort>,
        registry: Arc<dyn InstalledStateRepositoryPort>,
    ) -> Self {
        Self {
            paths,
            transport,
            engine: EngineConfig::default(),
            manifest,
            registry,
            disk: DiskBudget::system(),
            space_percent: DEFAULT_SPACE_PERCENT,
        }
    }
}

/// A running install, update, repair or restore.
#[derive(Debug)]
pub struct OperationHandle<T> {
    package_id: PackageId,
    kind: SessionKind,
    join: JoinHandle<InstallResult<T>>,
}

impl<T> OperationHandle<T> {
    /// Package the operation runs on.
    pub const fn package_id(&self) -> &PackageId {
        &self.package_id
    }

    /// Operation kind.
    pub const fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Wait for the operation to finish.
    pub async fn wait(self) -> InstallResult<T> {
        self.join
            .await
            .map_err(|e| InstallError::other(format!("{} task failed: {e}", self.kind)))?
    }
}

/// A game process started by [`Launcher::launch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedGame {
    /// Package that was started.
    pub package_id: PackageId,
    /// Executable that was run.
    pub executable: PathBuf,
    /// OS process id, if the platform reported one.
    pub pid: Option<u32>,
}

/// Installation and update orchestrator.
pub struct Launcher {
    hub: EventHub,
    coordinator: Arc<SessionCoordinator>,
    catalog: Arc<CatalogStore>,
    registry: Arc<dyn InstalledStateRepositoryPort>,
    manifest: Arc<dyn ManifestProviderPort>,
    installer: Arc<PackageInstaller>,
    updates: Arc<UpdateManager>,
    repairs: Arc<RepairEngine>,
    reconciler: ScanReconciler,
    paths: ResolvedPaths,
}

impl Launcher {
    /// Assemble a launcher.
    pub fn new(deps: LauncherDeps) -> Self {
        let hub = EventHub::new();
        let coordinator = Arc::new(SessionCoordinator::new(Arc::new(hub.clone())));
        let catalog = Arc::new(CatalogStore::new());
        let engine = Arc::new(MirrorDownloadEngine::new(deps.transport, deps.engine));
        let installer = Arc::new(
            PackageInstaller::new(
                engine,
                Arc::clone(&deps.registry),
                deps.disk,
                deps.paths.clone(),
            )
            .with_space_percent(deps.space_percent),
        );

        Self {
            updates: Arc::new(UpdateManager::new(Arc::clone(&installer), Arc::clone(&catalog))),
            repairs: Arc::new(RepairEngine::new(Arc::clone(&installer), Arc::clone(&catalog))),
            reconciler: ScanReconciler::new(&deps.paths.install_root),
            hub,
            coordinator,
            catalog,
            registry: deps.registry,
            manifest: deps.manifest,
            installer,
            paths: deps.paths,
        }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> EventSubscription {
        self.hub.subscribe()
    }

    /// Session coordinator.
    pub const fn coordinator(&self) -> &Arc<SessionCoordinator> {
        &self.coordinator
    }

    /// Catalog store.
    pub const fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }

    /// Resolved directory layout.
    pub const fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    /// Reload the catalog from the manifest provider.
    pub async fn refresh_catalog(&self) -> Result<CatalogSource, ManifestError> {
        let snapshot = self.manifest.fetch_catalog().await?;
        let source = snapshot.source;
        tracing::info!(
            target: "arcade.install",
            entries = snapshot.entries.len(),
            source = ?source,
            "Catalog loaded"
        );
        self.catalog.replace(snapshot);
        self.resolve_installed().await;
        Ok(source)
    }

    /// Re-resolve statuses of installed entries after a catalog reload.
    async fn resolve_installed(&self) {
        let records = match self.registry.list().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(target: "arcade.install", error = %e, "Installed records unavailable, statuses not refreshed");
                return;
            }
        };
        for record in records
            .iter()
            .filter(|r| r.is_present() && !self.coordinator.is_active(&r.package_id))
        {
            mark_installed(&self.catalog, record);
        }
    }

    /// Reconcile the catalog and registry against the install root, persisting
    /// corrected records.
    ///
    /// Packages with a live session are left as they are: their directories
    /// may be moved aside mid-operation.
    pub async fn scan(&self) -> InstallResult<ScanReport> {
        let busy: HashSet<PackageId> = self
            .coordinator
            .snapshot()
            .into_iter()
            .map(|s| s.package_id)
            .collect();
        let (held, idle): (Vec<_>, Vec<_>) = self
            .registry
            .list()
            .await?
            .into_iter()
            .partition(|r| busy.contains(&r.package_id));

        let mut report = self
            .reconciler
            .scan(self.catalog.entries(), idle.clone())
            .await?;
        report.records.retain(|r| !busy.contains(&r.package_id));
        report.records_changed = report.records != idle;
        if report.records_changed {
            self.persist_corrections(&idle, &report.records).await?;
        }

        let settled: Vec<CatalogEntry> = report
            .entries
            .iter()
            .filter(|e| !busy.contains(&e.id))
            .cloned()
            .collect();
        self.catalog.annotate(&settled);
        for entry in report.entries.iter_mut().filter(|e| busy.contains(&e.id)) {
            if let Some(current) = self.catalog.entry(&entry.id) {
                entry.status = current.status;
            }
        }
        if !held.is_empty() {
            tracing::debug!(target: "arcade.install", held = held.len(), "Skipped packages with live sessions");
        }
        report.records.extend(held);
        Ok(report)
    }

    /// Write only the records a scan dropped or adopted.
    async fn persist_corrections(
        &self,
        before: &[InstalledRecord],
        after: &[InstalledRecord],
    ) -> InstallResult<()> {
        for record in before {
            if !after.iter().any(|r| r.package_id == record.package_id) {
                self.registry.remove(&record.package_id).await?;
            }
        }
        for record in after {
            if !before.contains(record) {
                self.registry.upsert(record).await?;
            }
        }
        Ok(())
    }

    /// Catalog entries with their current status.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.catalog.entries()
    }

    /// Installed records.
    pub async fn installed(&self) -> InstallResult<Vec<InstalledRecord>> {
        Ok(self.registry.list().await?)
    }

    /// Live sessions.
    pub fn sessions(&self) -> Vec<DownloadSession> {
        self.coordinator.snapshot()
    }

    /// Start installing a package.
    pub fn install(&self, package_id: &PackageId) -> InstallResult<OperationHandle<InstalledPaths>> {
        let entry = self.catalog.require(package_id)?;
        let installer = Arc::clone(&self.installer);
        let catalog = Arc::clone(&self.catalog);

        self.spawn(package_id, SessionKind::Install, move |handle| async move {
            let result = installer.install(&entry, &handle).await;
            finish(handle, result.map(|(record, paths)| {
                mark_installed(&catalog, &record);
                (paths.install_dir.clone(), paths.executable_path.clone(), paths)
            }))
        })
    }

    /// Start updating a package to the catalog version.
    pub fn update(&self, package_id: &PackageId) -> InstallResult<OperationHandle<InstalledPaths>> {
        self.catalog.require(package_id)?;
        let updates = Arc::clone(&self.updates);
        let catalog = Arc::clone(&self.catalog);

        self.spawn(package_id, SessionKind::Update, move |handle| async move {
            let result = updates.apply_update(&handle).await;
            finish(handle, result.map(|(record, paths)| {
                mark_installed(&catalog, &record);
                (paths.install_dir.clone(), paths.executable_path.clone(), paths)
            }))
        })
    }

    /// Start repairing a package.
    ///
    /// Failures after the repair started are reported in the returned
    /// [`RepairReport`]; only admission and precondition failures are errors.
    pub fn repair(&self, package_id: &PackageId) -> InstallResult<OperationHandle<RepairReport>> {
        self.catalog.require(package_id)?;
        let repairs = Arc::clone(&self.repairs);
        let registry = Arc::clone(&self.registry);
        let catalog = Arc::clone(&self.catalog);

        self.spawn(package_id, SessionKind::Repair, move |handle| async move {
            match repairs.repair(&handle).await {
                Ok(report) => {
                    if let Ok(Some(record)) = registry.get(handle.package_id()).await {
                        mark_installed(&catalog, &record);
                        handle.complete(Some(record.install_dir.clone()), Some(record.executable_path()));
                    } else {
                        handle.complete(None, None);
                    }
                    Ok(report)
                }
                Err(e) if is_precondition(&e) || e.is_cancelled() => {
                    handle.fail(&e);
                    Err(e)
                }
                Err(e) => {
                    let report = RepairReport::failed(&e);
                    handle.fail(&e);
                    Ok(report)
                }
            }
        })
    }

    /// Start restoring a retained backup.
    pub fn restore(
        &self,
        package_id: &PackageId,
        version: &str,
    ) -> InstallResult<OperationHandle<PathBuf>> {
        let updates = Arc::clone(&self.updates);
        let catalog = Arc::clone(&self.catalog);
        let version = version.to_string();

        self.spawn(package_id, SessionKind::Restore, move |handle| async move {
            let result = updates.restore_backup(&handle, &version).await;
            finish(handle, result.map(|(record, executable)| {
                mark_installed(&catalog, &record);
                (record.install_dir, executable.clone(), executable)
            }))
        })
    }

    /// Compare the installed version with the catalog.
    pub async fn check_update(&self, package_id: &PackageId) -> InstallResult<UpdateCheck> {
        self.updates.check_update(package_id).await
    }

    /// Compare an explicit version with the catalog.
    pub fn check_update_against(
        &self,
        package_id: &PackageId,
        current_version: &str,
    ) -> InstallResult<UpdateCheck> {
        self.updates.check_update_against(package_id, current_version)
    }

    /// Retained backups, oldest first.
    pub async fn backups(&self, package_id: &PackageId) -> InstallResult<Vec<BackupSnapshot>> {
        self.updates.list_backups(package_id).await
    }

    /// Start an installed game.
    ///
    /// The process runs detached with the install directory as its working
    /// directory; the launcher does not wait for it.
    pub async fn launch(&self, package_id: &PackageId) -> InstallResult<LaunchedGame> {
        if self.coordinator.is_active(package_id) {
            return Err(InstallError::already_in_progress(package_id));
        }
        let record = self
            .registry
            .get(package_id)
            .await?
            .ok_or_else(|| InstallError::not_installed(package_id))?;
        let executable = record.executable_path();
        if !executable.is_file() {
            return Err(InstallError::ExecutableMissing {
                package_id: package_id.to_string(),
                path: executable.display().to_string(),
            });
        }

        let child = tokio::process::Command::new(&executable)
            .current_dir(&record.install_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| InstallError::io_context("starting game", &e))?;
        let pid = child.id();
        tracing::info!(
            target: "arcade.install",
            package_id = %package_id,
            version = %record.installed_version,
            executable = %executable.display(),
            pid = ?pid,
            "Game launched"
        );

        Ok(LaunchedGame {
            package_id: package_id.clone(),
            executable,
            pid,
        })
    }

    /// Cancel the running operation on a package.
    pub fn cancel(&self, package_id: &PackageId) -> InstallResult<()> {
        self.coordinator.cancel(package_id)
    }

    /// Cancel every running operation.
    pub fn cancel_all(&self) -> usize {
        self.coordinator.cancel_all()
    }

    fn spawn<T, F, Fut>(
        &self,
        package_id: &PackageId,
        kind: SessionKind,
        op: F,
    ) -> InstallResult<OperationHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce(SessionHandle) -> Fut,
        Fut: Future<Output = InstallResult<T>> + Send + 'static,
    {
        let handle = self.coordinator.begin(package_id, kind)?;
        tracing::debug!(target: "arcade.install", package_id = %package_id, kind = %kind, "Operation admitted");
        Ok(OperationHandle {
            package_id: package_id.clone(),
            kind,
            join: tokio::spawn(op(handle)),
        })
    }
}

impl std::fmt::Debug for Launcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launcher")
            .field("install_root", &self.paths.install_root)
            .field("active", &self.coordinator.active_count())
            .finish_non_exhaustive()
    }
}

/// Report the terminal state of `handle` and hand back the value.
fn finish<T>(
    handle: SessionHandle,
    result: InstallResult<(PathBuf, PathBuf, T)>,
) -> InstallResult<T> {
    match result {
        Ok((install_dir, executable, value)) => {
            handle.complete(Some(install_dir), Some(executable));
            Ok(value)
        }
        Err(e) => {
            handle.fail(&e);
            Err(e)
        }
    }
}

fn mark_installed(catalog: &CatalogStore, record: &InstalledRecord) {
    if let Some(entry) = catalog.entry(&record.package_id) {
        let status = EntryStatus::resolve(
            entry.is_coming_soon,
            true,
            Some(&record.installed_version),
            &entry.version,
        );
        catalog.set_status(&record.package_id, status);
    }
}

const fn is_precondition(error: &InstallError) -> bool {
    matches!(
        error,
        InstallError::RepairDisabled { .. }
            | InstallError::NotInstalled { .. }
            | InstallError::UnknownPackage { .. }
            | InstallError::Registry { .. }
    )
}
