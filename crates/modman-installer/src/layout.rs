use std::fs;
use std::path::{Path, PathBuf};

use modman_core::{ModError, PackageId, Result};

pub const REGISTRY_FILE_NAME: &str = "installed.json";

/// Fixed on-disk layout: one content directory per package under the host
/// application's mod base, plus the manager's own state root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModLayout {
    install_base: PathBuf,
    state_root: PathBuf,
}

impl ModLayout {
    pub fn new(install_base: impl Into<PathBuf>, state_root: impl Into<PathBuf>) -> Self {
        Self {
            install_base: install_base.into(),
            state_root: state_root.into(),
        }
    }

    pub fn install_base(&self) -> &Path {
        &self.install_base
    }

    pub fn state_root(&self) -> &Path {
        &self.state_root
    }

    pub fn install_path(&self, package_id: &PackageId) -> PathBuf {
        self.install_base.join(package_id.as_str())
    }

    pub fn registry_path(&self) -> PathBuf {
        self.state_root.join(REGISTRY_FILE_NAME)
    }

    pub fn config_path(&self) -> PathBuf {
        self.state_root.join("config.toml")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.state_root.join("tmp")
    }

    pub fn staging_root(&self) -> PathBuf {
        self.tmp_dir().join("staging")
    }

    pub fn staging_dir(&self, package_id: &PackageId) -> PathBuf {
        self.staging_root().join(package_id.as_str())
    }

    pub fn self_update_dir(&self) -> PathBuf {
        self.tmp_dir().join("self-update")
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [
            self.install_base.clone(),
            self.state_root.clone(),
            self.tmp_dir(),
            self.staging_root(),
        ] {
            fs::create_dir_all(&dir).map_err(|err| ModError::filesystem("create", &dir, err))?;
        }
        Ok(())
    }
}
