use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use modman_core::{ModError, PackageId, Result};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::fs_utils::remove_path_if_exists;
use crate::layout::ModLayout;

const ENTRY_CHUNK_SIZE: usize = 64 * 1024;

/// Owns one package's staging directory for the duration of an install run
/// and removes it when dropped, whatever the outcome.
#[derive(Debug)]
pub struct StagingGuard {
    dir: PathBuf,
}

impl StagingGuard {
    pub fn new(layout: &ModLayout, package_id: &PackageId) -> Self {
        Self {
            dir: layout.staging_dir(package_id),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        match remove_path_if_exists(&self.dir) {
            Ok(true) => debug!(dir = %self.dir.display(), "removed staging dir"),
            Ok(false) => {}
            Err(err) => warn!(
                dir = %self.dir.display(),
                error = %err,
                "failed to remove staging dir"
            ),
        }
    }
}

/// Unpacks `archive` into the package's staging directory and returns the
/// effective content root.
///
/// A stale staging directory left by an earlier crashed run is deleted
/// first. When the archive holds exactly one top-level entry and that entry
/// is a directory, the inner directory is returned instead of the
/// extraction target.
///
/// An archive that unpacks to no regular files (only directory entries, or
/// nothing at all) is rejected as `CorruptArchive`. An empty mod directory
/// is never installed.
pub fn stage_archive(layout: &ModLayout, package_id: &PackageId, archive: &[u8]) -> Result<PathBuf> {
    let staging_dir = layout.staging_dir(package_id);
    remove_path_if_exists(&staging_dir)
        .map_err(|err| ModError::filesystem("remove stale staging dir", &staging_dir, err))?;
    fs::create_dir_all(&staging_dir)
        .map_err(|err| ModError::filesystem("create", &staging_dir, err))?;

    let files = extract_zip(package_id, archive, &staging_dir)?;
    if files == 0 {
        return Err(ModError::CorruptArchive {
            package_id: package_id.to_string(),
            reason: "archive contains no files".to_string(),
        });
    }

    let root = effective_root(&staging_dir)?;
    debug!(
        package = %package_id,
        files,
        root = %root.display(),
        "staged archive"
    );
    Ok(root)
}

fn extract_zip(package_id: &PackageId, archive: &[u8], dst: &Path) -> Result<usize> {
    let corrupt = |reason: String| ModError::CorruptArchive {
        package_id: package_id.to_string(),
        reason,
    };

    let mut zip = ZipArchive::new(Cursor::new(archive)).map_err(|err| corrupt(err.to_string()))?;
    let mut files = 0_usize;
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|err| corrupt(err.to_string()))?;
        let Some(rel_path) = entry.enclosed_name() else {
            return Err(corrupt(format!(
                "entry '{}' escapes the extraction directory",
                entry.name()
            )));
        };
        let out_path = dst.join(rel_path);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)
                .map_err(|err| ModError::filesystem("create", &out_path, err))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| ModError::filesystem("create", parent, err))?;
        }

        let entry_name = entry.name().to_string();
        write_entry(package_id, &mut entry, &entry_name, &out_path)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;

            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode | 0o600))
                .map_err(|err| ModError::filesystem("set permissions on", &out_path, err))?;
        }

        files += 1;
    }

    Ok(files)
}

/// Copies one entry to disk in fixed-size chunks. The size declared in the
/// entry header is never used to size a buffer.
fn write_entry<R: Read>(
    package_id: &PackageId,
    entry: &mut R,
    entry_name: &str,
    out_path: &Path,
) -> Result<()> {
    let mut file =
        fs::File::create(out_path).map_err(|err| ModError::filesystem("create", out_path, err))?;
    let mut buffer = vec![0_u8; ENTRY_CHUNK_SIZE];
    loop {
        let read = match entry.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(ModError::CorruptArchive {
                    package_id: package_id.to_string(),
                    reason: format!("entry '{entry_name}': {err}"),
                })
            }
        };
        file.write_all(&buffer[..read])
            .map_err(|err| ModError::filesystem("write", out_path, err))?;
    }
    file.flush()
        .map_err(|err| ModError::filesystem("write", out_path, err))
}

fn effective_root(staging_dir: &Path) -> Result<PathBuf> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(staging_dir)
        .map_err(|err| ModError::filesystem("read", staging_dir, err))?
    {
        let entry = entry.map_err(|err| ModError::filesystem("read", staging_dir, err))?;
        entries.push(entry.path());
        if entries.len() > 1 {
            return Ok(staging_dir.to_path_buf());
        }
    }

    match entries.pop() {
        Some(only) if fs::symlink_metadata(&only).is_ok_and(|meta| meta.is_dir()) => Ok(only),
        _ => Ok(staging_dir.to_path_buf()),
    }
}
