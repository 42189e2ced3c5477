use modman_core::PackageId;

use crate::fs_utils::dir_has_entries;
use crate::layout::ModLayout;
use crate::state::InstalledRegistry;

/// Install state of one package, optionally compared against the latest
/// published tag. Tags are compared for string equality only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageStatus {
    NotInstalled,
    /// Files present on disk without a registry entry.
    LegacyInstall,
    /// Registry entry present but the install directory is gone or empty.
    MissingFiles { version: String },
    /// Installed; latest release not consulted.
    Installed { version: String },
    UpToDate { version: String },
    UpdateAvailable { installed: String, latest: String },
}

impl PackageStatus {
    pub fn needs_install(&self) -> bool {
        matches!(
            self,
            Self::LegacyInstall | Self::MissingFiles { .. } | Self::UpdateAvailable { .. }
        )
    }

    pub fn is_installed(&self) -> bool {
        !matches!(self, Self::NotInstalled | Self::MissingFiles { .. })
    }
}

pub fn package_status(
    layout: &ModLayout,
    registry: &InstalledRegistry,
    package_id: &PackageId,
    latest: Option<&str>,
) -> PackageStatus {
    let on_disk = dir_has_entries(&layout.install_path(package_id));
    let Some(entry) = registry.get(package_id) else {
        return if on_disk {
            PackageStatus::LegacyInstall
        } else {
            PackageStatus::NotInstalled
        };
    };

    if !on_disk {
        return PackageStatus::MissingFiles {
            version: entry.version.clone(),
        };
    }

    match latest {
        None => PackageStatus::Installed {
            version: entry.version.clone(),
        },
        Some(latest) if latest == entry.version => PackageStatus::UpToDate {
            version: entry.version.clone(),
        },
        Some(latest) => PackageStatus::UpdateAvailable {
            installed: entry.version.clone(),
            latest: latest.to_string(),
        },
    }
}
