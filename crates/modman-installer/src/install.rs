use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use modman_core::{AssetKind, ModError, PackageId, Result};
use modman_resolver::{resolve_latest, ArtifactFetcher, ReleaseFeed};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::fs_utils::remove_path_if_exists;
use crate::layout::ModLayout;
use crate::place::place_staged;
use crate::stage::{stage_archive, StagingGuard};
use crate::state::{InstalledEntry, RegistryStore};
use crate::uninstall::{uninstall_package, UninstallOutcome};
use crate::worker::{spawn_task, TaskHandle};

const PROGRESS_START: u8 = 5;
const PROGRESS_REMOVED_EXISTING: u8 = 10;
const PROGRESS_CHECKED_EXISTING: u8 = 20;
const PROGRESS_RESOLVED: u8 = 25;
const PROGRESS_DOWNLOADED: u8 = 40;
const PROGRESS_STAGED: u8 = 60;
const PROGRESS_PLACED: u8 = 90;
const PROGRESS_PERSISTED: u8 = 95;
const PROGRESS_DONE: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledRecord {
    pub package_id: PackageId,
    pub version: String,
    pub install_path: PathBuf,
    pub artifact_sha256: String,
    pub replaced_existing: bool,
}

/// Drives resolve, download, stage, place and persist for one package.
#[derive(Clone)]
pub struct Installer {
    layout: ModLayout,
    store: RegistryStore,
    feed: Arc<dyn ReleaseFeed>,
    fetcher: Arc<dyn ArtifactFetcher>,
}

impl Installer {
    pub fn new(
        layout: ModLayout,
        store: RegistryStore,
        feed: Arc<dyn ReleaseFeed>,
        fetcher: Arc<dyn ArtifactFetcher>,
    ) -> Self {
        Self {
            layout,
            store,
            feed,
            fetcher,
        }
    }

    pub fn layout(&self) -> &ModLayout {
        &self.layout
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Installs the latest release of `package_id`, always as a full
    /// reinstall.
    ///
    /// Progress is reported as non-decreasing percentages. The staging
    /// directory is removed before returning on every path, and the
    /// registry is only written after placement succeeded.
    pub fn install(
        &self,
        package_id: &PackageId,
        on_progress: Option<&mut dyn FnMut(u8)>,
    ) -> Result<InstalledRecord> {
        let mut progress = ProgressReporter::new(on_progress);
        progress.report(PROGRESS_START);
        info!(package = %package_id, "install started");

        let staging = StagingGuard::new(&self.layout, package_id);
        let result = self.run_pipeline(package_id, &mut progress);
        drop(staging);

        match &result {
            Ok(record) => {
                progress.report(PROGRESS_DONE);
                info!(
                    package = %package_id,
                    version = %record.version,
                    path = %record.install_path.display(),
                    "install finished"
                );
            }
            Err(err) => warn!(package = %package_id, error = %err, "install failed"),
        }
        result
    }

    pub fn uninstall(&self, package_id: &PackageId) -> Result<UninstallOutcome> {
        uninstall_package(&self.layout, &self.store, package_id)
    }

    /// Runs [`Installer::install`] on a dedicated worker thread.
    pub fn spawn_install(&self, package_id: PackageId) -> Result<TaskHandle<InstalledRecord>> {
        let installer = self.clone();
        let task_id = package_id.clone();
        spawn_task(task_id, move |on_progress| {
            installer.install(&package_id, Some(on_progress))
        })
    }

    pub fn spawn_uninstall(&self, package_id: PackageId) -> Result<TaskHandle<UninstallOutcome>> {
        let installer = self.clone();
        let task_id = package_id.clone();
        spawn_task(task_id, move |on_progress| {
            on_progress(PROGRESS_START);
            let outcome = installer.uninstall(&package_id)?;
            on_progress(PROGRESS_DONE);
            Ok(outcome)
        })
    }

    fn run_pipeline(
        &self,
        package_id: &PackageId,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<InstalledRecord> {
        let install_path = self.layout.install_path(package_id);
        let replaced_existing = remove_path_if_exists(&install_path)
            .map_err(|err| ModError::filesystem("remove existing install", &install_path, err))?;
        if replaced_existing {
            info!(package = %package_id, "existing install removed, reinstalling");
            progress.report(PROGRESS_REMOVED_EXISTING);
        }
        progress.report(PROGRESS_CHECKED_EXISTING);

        let release = resolve_latest(self.feed.as_ref(), package_id, AssetKind::Archive)?;
        progress.report(PROGRESS_RESOLVED);

        info!(package = %package_id, url = %release.artifact_url, "downloading");
        let archive = self.fetcher.fetch(&release.artifact_url)?;
        let artifact_sha256 = hex::encode(Sha256::digest(&archive));
        progress.report(PROGRESS_DOWNLOADED);

        let staged_root = stage_archive(&self.layout, package_id, &archive)?;
        drop(archive);
        progress.report(PROGRESS_STAGED);

        let install_path = place_staged(&self.layout, package_id, &staged_root)?;
        progress.report(PROGRESS_PLACED);

        let entry = InstalledEntry {
            version: release.version.clone(),
            installed_at_unix: current_unix_timestamp(),
            artifact_sha256: Some(artifact_sha256.clone()),
        };
        if let Err(err) = self.store.upsert(package_id, entry) {
            rollback_placement(package_id, &install_path);
            return Err(err);
        }
        progress.report(PROGRESS_PERSISTED);

        Ok(InstalledRecord {
            package_id: package_id.clone(),
            version: release.version,
            install_path,
            artifact_sha256,
            replaced_existing,
        })
    }
}

/// Keeps "no directory without a registry entry" when the registry write fails.
fn rollback_placement(package_id: &PackageId, install_path: &std::path::Path) {
    if let Err(err) = remove_path_if_exists(install_path) {
        warn!(
            package = %package_id,
            path = %install_path.display(),
            error = %err,
            "failed to roll back placed install"
        );
    }
}

fn current_unix_timestamp() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|elapsed| elapsed.as_secs())
}

/// Forwards progress to an optional callback, clamping to a non-decreasing
/// sequence within `0..=100`.
pub(crate) struct ProgressReporter<'a> {
    sink: Option<&'a mut dyn FnMut(u8)>,
    last: u8,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(sink: Option<&'a mut dyn FnMut(u8)>) -> Self {
        Self { sink, last: 0 }
    }

    pub(crate) fn report(&mut self, percent: u8) {
        let percent = percent.clamp(self.last, PROGRESS_DONE);
        self.last = percent;
        if let Some(sink) = self.sink.as_deref_mut() {
            sink(percent);
        }
    }
}
