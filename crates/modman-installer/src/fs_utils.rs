use std::fs;
use std::io;
use std::path::Path;

use modman_core::{ModError, Result};

/// Removes a directory tree (or a stray file) at `path`. Returns whether
/// anything was there.
pub(crate) fn remove_path_if_exists(path: &Path) -> io::Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}

pub(crate) fn dir_has_entries(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

pub(crate) fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).map_err(|err| ModError::filesystem("create", dst, err))?;
    let entries = fs::read_dir(src).map_err(|err| ModError::filesystem("read", src, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| ModError::filesystem("read", src, err))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let metadata = fs::symlink_metadata(&src_path)
            .map_err(|err| ModError::filesystem("stat", &src_path, err))?;
        if metadata.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
            continue;
        }

        #[cfg(unix)]
        if metadata.file_type().is_symlink() {
            let target = fs::read_link(&src_path)
                .map_err(|err| ModError::filesystem("read symlink", &src_path, err))?;
            std::os::unix::fs::symlink(&target, &dst_path)
                .map_err(|err| ModError::filesystem("create symlink", &dst_path, err))?;
            continue;
        }

        fs::copy(&src_path, &dst_path)
            .map_err(|err| ModError::filesystem("copy into", &dst_path, err))?;
    }
    Ok(())
}
