use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use modman_core::{ModError, ModErrorKind, PackageId, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstalledEntry {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at_unix: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_sha256: Option<String>,
}

impl InstalledEntry {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            installed_at_unix: None,
            artifact_sha256: None,
        }
    }
}

static TMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

pub type InstalledRegistry = BTreeMap<PackageId, InstalledEntry>;

/// The persisted package-id to installed-version mapping.
///
/// The whole file is read on every load and rewritten on every mutation.
/// There is no locking: concurrent mutations race on the read-modify-write
/// and the last rename wins. Every write stages through its own tmp file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty registry.
    pub fn load(&self) -> Result<InstalledRegistry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(InstalledRegistry::new())
            }
            Err(err) => return Err(ModError::filesystem("read", &self.path, err)),
        };
        if content.trim().is_empty() {
            return Ok(InstalledRegistry::new());
        }

        serde_json::from_str(&content).map_err(|source| ModError::RegistryCorrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Like [`RegistryStore::load`], but a corrupt file degrades to an empty
    /// registry with a logged warning.
    pub fn load_or_recover(&self) -> Result<InstalledRegistry> {
        self.load_or_recover_with(|_| {})
    }

    /// [`RegistryStore::load_or_recover`], also handing the corruption
    /// error to `on_corrupt` so a UI can surface it.
    pub fn load_or_recover_with(&self, on_corrupt: impl FnOnce(&ModError)) -> Result<InstalledRegistry> {
        match self.load() {
            Err(err) if err.kind() == ModErrorKind::RegistryCorrupt => {
                warn!(error = %err, "treating corrupt registry as empty");
                on_corrupt(&err);
                Ok(InstalledRegistry::new())
            }
            other => other,
        }
    }

    pub fn save(&self, registry: &InstalledRegistry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| ModError::filesystem("create registry dir", parent, err))?;
        }

        let mut content = serde_json::to_string_pretty(registry)
            .map_err(|err| ModError::filesystem("serialize", &self.path, io::Error::other(err)))?;
        content.push('\n');

        let tmp_path = self.sibling_path(&format!("tmp-{}", unique_suffix()));
        fs::write(&tmp_path, content)
            .map_err(|err| ModError::filesystem("write", &tmp_path, err))?;
        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(ModError::filesystem("replace", &self.path, err));
        }
        Ok(())
    }

    pub fn get(&self, package_id: &PackageId) -> Result<Option<InstalledEntry>> {
        Ok(self.load_or_recover()?.remove(package_id))
    }

    pub fn set_version(&self, package_id: &PackageId, version: &str) -> Result<()> {
        self.upsert(package_id, InstalledEntry::new(version))
    }

    pub fn upsert(&self, package_id: &PackageId, entry: InstalledEntry) -> Result<()> {
        let mut registry = self.load_for_update()?;
        registry.insert(package_id.clone(), entry);
        self.save(&registry)
    }

    /// Returns whether an entry was present.
    pub fn remove(&self, package_id: &PackageId) -> Result<bool> {
        let mut registry = self.load_for_update()?;
        let removed = registry.remove(package_id).is_some();
        if removed {
            self.save(&registry)?;
        }
        Ok(removed)
    }

    /// Loads for a read-modify-write. A corrupt file is set aside as
    /// `<name>.corrupt` so the rewrite does not destroy it.
    fn load_for_update(&self) -> Result<InstalledRegistry> {
        match self.load() {
            Err(err) if err.kind() == ModErrorKind::RegistryCorrupt => {
                let backup = self.sibling_path("corrupt");
                warn!(
                    error = %err,
                    backup = %backup.display(),
                    "registry is corrupt; preserving it and starting from an empty registry"
                );
                fs::rename(&self.path, &backup)
                    .map_err(|err| ModError::filesystem("preserve corrupt registry", &backup, err))?;
                Ok(InstalledRegistry::new())
            }
            other => other,
        }
    }

    fn sibling_path(&self, suffix: &str) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("installed.json");
        self.path.with_file_name(format!("{file_name}.{suffix}"))
    }
}

/// Distinct per process, per write, and across threads of one process.
fn unique_suffix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = TMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}-{nanos}-{seq}", std::process::id())
}
