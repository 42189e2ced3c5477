use modman_core::{ModError, PackageId, Result};
use tracing::info;

use crate::fs_utils::remove_path_if_exists;
use crate::layout::ModLayout;
use crate::state::RegistryStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallStatus {
    NotInstalled,
    Uninstalled,
    /// Registry entry removed, package files were already missing.
    RepairedStaleState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallOutcome {
    pub package_id: PackageId,
    pub version: Option<String>,
    pub removed_directory: bool,
    pub status: UninstallStatus,
}

/// Removes the install directory, then the registry entry.
///
/// The registry removal is attempted even when no directory existed so a
/// dangling entry heals itself. Directory first: an interruption between
/// the two steps leaves a stale entry, never an orphaned directory.
pub fn uninstall_package(
    layout: &ModLayout,
    store: &RegistryStore,
    package_id: &PackageId,
) -> Result<UninstallOutcome> {
    let version = store.get(package_id)?.map(|entry| entry.version);

    let install_path = layout.install_path(package_id);
    let removed_directory = remove_path_if_exists(&install_path)
        .map_err(|err| ModError::filesystem("remove install", &install_path, err))?;
    let removed_entry = store.remove(package_id)?;

    let status = match (removed_directory, removed_entry) {
        (true, _) => UninstallStatus::Uninstalled,
        (false, true) => UninstallStatus::RepairedStaleState,
        (false, false) => UninstallStatus::NotInstalled,
    };
    info!(package = %package_id, ?status, "uninstall finished");

    Ok(UninstallOutcome {
        package_id: package_id.clone(),
        version,
        removed_directory,
        status,
    })
}

/// Returns true when an install directory was actually removed.
pub fn uninstall(layout: &ModLayout, store: &RegistryStore, package_id: &PackageId) -> Result<bool> {
    uninstall_package(layout, store, package_id).map(|outcome| outcome.removed_directory)
}
