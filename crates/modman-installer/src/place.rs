use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use modman_core::{ModError, PackageId, Result};
use tracing::{debug, warn};

use crate::fs_utils::{copy_dir_recursive, remove_path_if_exists};
use crate::layout::ModLayout;

/// Moves staged content into the package's install directory, replacing any
/// previous install wholesale.
///
/// Uses a rename when staging and destination share a volume and falls back
/// to copy + delete otherwise. A failed copy removes the partial destination
/// before returning.
pub fn place_staged(layout: &ModLayout, package_id: &PackageId, staged_root: &Path) -> Result<PathBuf> {
    place_staged_with(
        layout,
        package_id,
        staged_root,
        |src, dst| fs::rename(src, dst),
        copy_dir_recursive,
    )
}

/// [`place_staged`] with the move and copy steps supplied by the caller.
pub(crate) fn place_staged_with<M, C>(
    layout: &ModLayout,
    package_id: &PackageId,
    staged_root: &Path,
    rename: M,
    copy: C,
) -> Result<PathBuf>
where
    M: FnOnce(&Path, &Path) -> io::Result<()>,
    C: FnOnce(&Path, &Path) -> Result<()>,
{
    let dst = layout.install_path(package_id);
    remove_path_if_exists(&dst)
        .map_err(|err| ModError::filesystem("remove previous install", &dst, err))?;

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| ModError::filesystem("create install parent", parent, err))?;
    }

    match rename(staged_root, &dst) {
        Ok(()) => {
            debug!(package = %package_id, dst = %dst.display(), "placed by rename");
        }
        Err(rename_err) => {
            debug!(
                package = %package_id,
                error = %rename_err,
                "rename failed, falling back to copy"
            );
            if let Err(err) = copy(staged_root, &dst) {
                if let Err(cleanup_err) = remove_path_if_exists(&dst) {
                    warn!(
                        dst = %dst.display(),
                        error = %cleanup_err,
                        "failed to remove partially placed install"
                    );
                }
                return Err(err);
            }
            if let Err(err) = remove_path_if_exists(staged_root) {
                warn!(
                    src = %staged_root.display(),
                    error = %err,
                    "failed to remove staged content after copy"
                );
            }
        }
    }

    Ok(dst)
}
