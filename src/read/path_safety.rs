//! Target path resolution for extracted entries.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Bytes reserved below the path limit for directories, so files created
/// inside them still fit.
const DIRECTORY_RESERVE: usize = 12;

/// Joins a sanitized `/`-separated `relative` name onto `target_dir`.
///
/// `..` and `.` components are rejected as [`Error::PathTraversal`]. The
/// resulting path must not exceed `limit` bytes (`limit - 12` for
/// directories), otherwise [`Error::NameTooLong`] is returned.
pub(crate) fn resolve_target(
    target_dir: &Path,
    relative: &str,
    is_directory: bool,
    limit: usize,
) -> Result<PathBuf> {
    let mut path = target_dir.to_path_buf();
    for component in relative.split('/').filter(|c| !c.is_empty()) {
        if component == ".." || component == "." {
            return Err(Error::PathTraversal {
                entry_name: relative.to_string(),
            });
        }
        path.push(component);
    }

    let limit = if is_directory {
        limit.saturating_sub(DIRECTORY_RESERVE)
    } else {
        limit
    };
    if path.as_os_str().len() > limit {
        return Err(Error::NameTooLong { path, limit });
    }
    Ok(path)
}

/// Replaces the last component of `relative` with `rename_to`.
pub(crate) fn renamed(relative: &str, rename_to: &str) -> String {
    match relative.rsplit_once('/') {
        Some((dir, _)) => format!("{}/{}", dir, rename_to),
        None => rename_to.to_string(),
    }
}
