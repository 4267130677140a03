//! Metadata preservation for extracted files.

use std::path::Path;

use crate::fs::FileSystem;

use super::{DirectoryEntry, PreserveMetadata};

/// Applies the entry's timestamp and attributes to `path`.
///
/// Failures are logged and otherwise ignored.
pub(crate) fn apply_metadata(
    fs: &dyn FileSystem,
    path: &Path,
    entry: &DirectoryEntry,
    options: &PreserveMetadata,
) {
    if options.attributes {
        if let Err(e) = fs.set_attributes(path, entry.attributes, entry.unix_mode) {
            log::warn!("Failed to set attributes on '{}': {}", path.display(), e);
        }
    }

    // after attributes: a read-only file may still take a new mtime on
    // every platform filetime supports
    if options.modification_time {
        if let Err(e) = fs.set_modified(path, entry.modified()) {
            log::warn!(
                "Failed to set modification time on '{}': {}",
                path.display(),
                e
            );
        }
    }
}
