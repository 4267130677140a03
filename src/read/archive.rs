//! Opened ZIP archives.

use std::path::Path;
use std::sync::Arc;

use crate::format::directory::{self, DirectoryLocation};
use crate::fs::{FileSystem, StdFileSystem};
use crate::prompt::{AutoVolumes, VolumePrompt};
use crate::volume::{SpannedReader, VolumeState};
use crate::Result;

use super::{
    ArchiveInfo, DirectoryEntry, ExtractOptions, ExtractRequest, ExtractResult, ExtractSession,
    Selection,
};

/// A ZIP archive with its central directory loaded.
///
/// # Example
///
/// ```rust,no_run
/// use zunpack::read::{ExtractOptions, Selection, ZipArchive};
///
/// let mut archive = ZipArchive::open_path("photos.zip")?;
/// for entry in archive.entries() {
///     println!("{}: {} bytes", entry.name, entry.size);
/// }
///
/// let result = archive.extract("out", "", &Selection::All, ExtractOptions::new());
/// println!("{} entries extracted", result.entries_extracted);
/// # Ok::<(), zunpack::Error>(())
/// ```
pub struct ZipArchive {
    reader: SpannedReader,
    entries: Vec<DirectoryEntry>,
    info: ArchiveInfo,
}

impl std::fmt::Debug for ZipArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipArchive")
            .field("reader", &self.reader)
            .field("entries", &self.entries.len())
            .field("info", &self.info)
            .finish()
    }
}

impl ZipArchive {
    /// Opens an archive from the file system.
    ///
    /// For spanned archives pass the last volume (the `.zip` file); the
    /// other volumes are looked up next to it.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, Arc::new(StdFileSystem), Box::new(AutoVolumes))
    }

    /// Opens an archive through a custom file system and volume prompt.
    pub fn open_with(
        path: impl AsRef<Path>,
        fs: Arc<dyn FileSystem>,
        volume_prompt: Box<dyn VolumePrompt>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = SpannedReader::open(fs, volume_prompt, path)?;
        let location = directory::locate(&mut reader)?;
        let records = directory::read_central_directory(&mut reader, &location)?;
        let entries: Vec<DirectoryEntry> = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| DirectoryEntry::from_record(record, index))
            .collect();
        let info = summarize(&entries, &location);
        log::debug!(
            "opened '{}': {} entries, {} bytes",
            path.display(),
            info.entry_count,
            info.total_size
        );
        Ok(Self {
            reader,
            entries,
            info,
        })
    }

    /// Opens an archive with the file system and volume prompt configured
    /// in `options`, which are taken out of it.
    pub(crate) fn open_for(path: &Path, options: &mut ExtractOptions) -> Result<Self> {
        let fs = options.resolved_file_system();
        let prompt = options.take_volume_prompt();
        Self::open_with(path, fs, prompt)
    }

    /// Returns the entries in central directory order.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry with exactly this sanitized name.
    pub fn entry(&self, name: &str) -> Option<&DirectoryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Returns summary information.
    pub fn info(&self) -> &ArchiveInfo {
        &self.info
    }

    /// Returns which volumes have been opened so far.
    pub fn volume_state(&self) -> &VolumeState {
        self.reader.state()
    }

    pub(crate) fn parts_mut(&mut self) -> (&[DirectoryEntry], &mut SpannedReader) {
        (&self.entries, &mut self.reader)
    }

    /// Extracts the entries under `root` chosen by `selection` into
    /// `target_dir`.
    ///
    /// The volume prompt in `options` is ignored: it was fixed when the
    /// archive was opened.
    pub fn extract(
        &mut self,
        target_dir: impl AsRef<Path>,
        root: &str,
        selection: &Selection,
        options: ExtractOptions,
    ) -> ExtractResult {
        let request = ExtractRequest::new(target_dir.as_ref(), root, selection.clone());
        ExtractSession::new(options).run(self, &request)
    }

    /// Extracts one file by name or index; see
    /// [`ExtractSession::extract_single`].
    pub fn extract_single(
        &mut self,
        name: &str,
        item_index: Option<usize>,
        target_dir: impl AsRef<Path>,
        rename_to: Option<&str>,
        options: ExtractOptions,
    ) -> Result<()> {
        ExtractSession::new(options).extract_single(
            self,
            name,
            item_index,
            target_dir.as_ref(),
            rename_to,
        )
    }
}

fn summarize(entries: &[DirectoryEntry], location: &DirectoryLocation) -> ArchiveInfo {
    let mut info = ArchiveInfo {
        entry_count: entries.len(),
        is_multi_volume: location.multi_volume,
        is_zip64: location.zip64,
        prefix_bytes: location.extra_bytes,
        comment: (!location.comment.is_empty())
            .then(|| String::from_utf8_lossy(&location.comment).into_owned()),
        ..Default::default()
    };
    for entry in entries {
        if entry.is_directory {
            info.directory_count += 1;
        } else {
            info.total_size += entry.size;
        }
        info.packed_size += entry.compressed_size;
        info.has_encrypted_entries |= entry.is_encrypted();
        if !info.methods.contains(&entry.method) {
            info.methods.push(entry.method);
        }
    }
    info
}
