//! Extraction session: per-run state shared by every entry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::codec::{DecodeBuffers, FixedTableCache};
use crate::crypto::{EntryCipher, Password, PasswordCache};
use crate::error::ErrorCategory;
use crate::fs::FileSystem;
use crate::policy::{ErrorHandler, ErrorPolicy, Resolution, SkipErrors};
use crate::progress::{NoProgress, ProgressReporter};
use crate::prompt::{NoPasswordPrompt, PasswordPrompt, PasswordReply};
use crate::volume::{SpannedReader, order_by_volume};
use crate::{Error, Result};

use super::selection::{find_single, match_entries, relative_to, total_bytes};
use super::{
    DirectoryEntry, EntryOutcome, ExtractOptions, ExtractOutcome, ExtractResult, OverwritePolicy,
    PreserveMetadata, Selection, ZipArchive,
};

/// What to extract and where.
#[derive(Debug, Clone, Default)]
pub struct ExtractRequest {
    /// Directory receiving the output.
    pub target_dir: PathBuf,
    /// Archive folder the selection is relative to; empty for the root.
    pub root: String,
    /// Entries to process.
    pub selection: Selection,
    /// Replacement for the leaf name of every extracted entry.
    pub rename_to: Option<String>,
    /// Decode and verify without writing anything.
    pub test_only: bool,
}

impl ExtractRequest {
    /// Creates a request extracting `selection` from under `root` into
    /// `target_dir`.
    pub fn new(target_dir: impl Into<PathBuf>, root: &str, selection: Selection) -> Self {
        Self {
            target_dir: target_dir.into(),
            root: root.replace('\\', "/").trim_matches('/').to_string(),
            selection,
            rename_to: None,
            test_only: false,
        }
    }

    /// Creates a test-mode request for the entries matching `mask`.
    pub fn test(mask: &str) -> Self {
        Self {
            test_only: true,
            ..Self::new(PathBuf::new(), "", Selection::Masks(mask.to_string()))
        }
    }

    /// Name of `entry` below the target directory.
    pub(crate) fn relative_name(&self, entry: &DirectoryEntry) -> String {
        let relative = relative_to(&entry.name, &self.root, false).unwrap_or(entry.file_name());
        match &self.rename_to {
            Some(rename) => super::path_safety::renamed(relative, rename),
            None => relative.to_string(),
        }
    }
}

/// Result of password resolution for one entry.
pub(crate) enum Unlocked {
    Cipher(EntryCipher),
    Done(EntryOutcome),
}

/// State owned by one extraction or test run.
///
/// Holds the host callbacks, the accepted passwords, the per-category
/// skip-all flags and the decoder buffers. Everything is dropped together
/// when the session ends.
///
/// # Example
///
/// ```rust,no_run
/// use zunpack::read::{ExtractOptions, ExtractRequest, ExtractSession, Selection, ZipArchive};
///
/// let mut archive = ZipArchive::open_path("bundle.zip")?;
/// let mut session = ExtractSession::new(ExtractOptions::new().password("secret"));
///
/// let docs = ExtractRequest::new("out", "docs", Selection::All);
/// let result = session.run(&mut archive, &docs);
/// assert!(result.is_ok());
///
/// // the password accepted above is reused here without prompting
/// let images = ExtractRequest::new("out", "images", Selection::Masks("*.png".into()));
/// let _ = session.run(&mut archive, &images);
/// # Ok::<(), zunpack::Error>(())
/// ```
pub struct ExtractSession {
    pub(crate) fs: Arc<dyn FileSystem>,
    pub(crate) progress: Box<dyn ProgressReporter>,
    password_prompt: Box<dyn PasswordPrompt>,
    error_handler: Box<dyn ErrorHandler>,
    pub(crate) passwords: PasswordCache,
    pub(crate) policy: ErrorPolicy,
    pub(crate) tables: FixedTableCache,
    pub(crate) buffers: Option<DecodeBuffers>,
    pub(crate) overwrite: OverwritePolicy,
    pub(crate) preserve: PreserveMetadata,
    pub(crate) max_path_len: usize,
    title: String,
    pub(crate) bytes_done: u64,
    pub(crate) total_bytes: u64,
}

impl std::fmt::Debug for ExtractSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractSession")
            .field("passwords", &self.passwords.len())
            .field("policy", &self.policy)
            .field("overwrite", &self.overwrite)
            .field("max_path_len", &self.max_path_len)
            .finish_non_exhaustive()
    }
}

impl ExtractSession {
    /// Creates a session from `options`.
    ///
    /// The volume prompt is not used here; it belongs to the archive.
    pub fn new(options: ExtractOptions) -> Self {
        let fs = options.resolved_file_system();
        let mut passwords = PasswordCache::new();
        if let Some(password) = options.password {
            passwords.insert(password);
        }
        Self {
            fs,
            progress: options.progress.unwrap_or_else(|| Box::new(NoProgress)),
            password_prompt: options
                .password_prompt
                .unwrap_or_else(|| Box::new(NoPasswordPrompt)),
            error_handler: options.error_handler.unwrap_or_else(|| Box::new(SkipErrors)),
            passwords,
            policy: ErrorPolicy::new(),
            tables: FixedTableCache::default(),
            buffers: None,
            overwrite: options.overwrite,
            preserve: options.preserve_metadata,
            max_path_len: options.max_path_len,
            title: options.progress_title.unwrap_or_default(),
            bytes_done: 0,
            total_bytes: 0,
        }
    }

    /// Passwords accepted so far.
    pub fn passwords(&self) -> &PasswordCache {
        &self.passwords
    }

    /// Adds a password to try before prompting.
    pub fn add_password(&mut self, password: impl Into<Password>) {
        self.passwords.insert(password.into());
    }

    /// Extracts (or tests) the entries selected by `request`.
    ///
    /// Entry failures are resolved through the error handler and counted
    /// in the result. The run stops early on cancellation or when the
    /// archive turns out to be unreadable; see [`ExtractResult::outcome`].
    pub fn run(&mut self, archive: &mut ZipArchive, request: &ExtractRequest) -> ExtractResult {
        let (entries, reader) = archive.parts_mut();
        let mut selected = match_entries(entries, &request.root, &request.selection);
        order_by_volume(&mut selected, reader.is_multi_volume(), |e| {
            (e.disk_start, e.local_header_offset, e.index)
        });
        log::debug!("{} of {} entries selected", selected.len(), entries.len());

        self.begin(total_bytes(&selected));
        let mut result = ExtractResult::default();
        for entry in selected {
            self.progress.on_entry_start(&entry.name, entry.size);
            let start = self.bytes_done;
            let outcome = match self.extract_entry(reader, entry, request) {
                Ok(outcome) => outcome,
                Err(e) if e.is_cancelled() => EntryOutcome::Cancelled,
                Err(e) => {
                    log::warn!("Stopping at '{}': {}", entry.name, e);
                    self.progress.on_entry_complete(&entry.name, false);
                    result.outcome = ExtractOutcome::FatalCorruption(e);
                    break;
                }
            };

            let success = matches!(outcome, EntryOutcome::Success);
            self.progress.on_entry_complete(&entry.name, success);
            if let EntryOutcome::Failed(e) = &outcome {
                self.progress
                    .on_warning(&format!("{}: {}", entry.name, e));
            }
            result.record(&entry.name, &outcome, if success { entry.size } else { 0 });

            if matches!(outcome, EntryOutcome::Cancelled) || !self.advance(start, entry.size) {
                result.outcome = ExtractOutcome::Cancelled;
                break;
            }
        }
        self.progress.on_close();
        result
    }

    /// Extracts one file located by name or index.
    ///
    /// The output lands directly in `target_dir` under its own leaf name,
    /// or under `rename_to`. `Err` carries the reason the file was not
    /// written: [`Error::EntryNotFound`], [`Error::Cancelled`] or the error
    /// the entry failed with.
    pub fn extract_single(
        &mut self,
        archive: &mut ZipArchive,
        name: &str,
        item_index: Option<usize>,
        target_dir: &Path,
        rename_to: Option<&str>,
    ) -> Result<()> {
        let (entries, reader) = archive.parts_mut();
        let entry = find_single(entries, name, item_index)?;
        let request = ExtractRequest {
            rename_to: rename_to.map(str::to_string),
            ..ExtractRequest::new(target_dir, entry.parent(), Selection::All)
        };

        self.begin(entry.size);
        self.progress.on_entry_start(&entry.name, entry.size);
        let outcome = self.extract_entry(reader, entry, &request);
        self.progress
            .on_entry_complete(&entry.name, matches!(outcome, Ok(EntryOutcome::Success)));
        self.progress.on_close();

        match outcome? {
            EntryOutcome::Success | EntryOutcome::Skipped => Ok(()),
            EntryOutcome::Failed(e) => Err(e),
            EntryOutcome::Cancelled | EntryOutcome::Declined => Err(Error::Cancelled),
        }
    }

    fn begin(&mut self, total: u64) {
        self.total_bytes = total;
        self.bytes_done = 0;
        self.progress.on_open(&self.title, total);
    }

    /// Moves progress past an entry that produced less than its size.
    fn advance(&mut self, start: u64, size: u64) -> bool {
        let end = start.saturating_add(size);
        if self.bytes_done >= end {
            return true;
        }
        self.bytes_done = end;
        self.progress.on_progress(self.bytes_done, self.total_bytes)
    }

    /// Consults the error policy about `error`.
    ///
    /// Returns `Ok(None)` when the operation should be retried, the entry
    /// outcome otherwise, and `Err` for fatal errors.
    pub(crate) fn on_error(
        &mut self,
        context: &str,
        error: Error,
        retry_allowed: bool,
    ) -> Result<Option<EntryOutcome>> {
        if error.is_cancelled() {
            return Ok(Some(EntryOutcome::Cancelled));
        }
        let Some(category) = error.category() else {
            return Err(error);
        };
        let resolution = self.policy.resolve(
            self.error_handler.as_mut(),
            category,
            context,
            &error,
            retry_allowed,
        );
        Ok(match resolution {
            Resolution::Retry => None,
            Resolution::Skip | Resolution::SkipAll => Some(EntryOutcome::Failed(error)),
            Resolution::Cancel => Some(EntryOutcome::Cancelled),
        })
    }

    /// Resolves an error for an operation that cannot be retried.
    pub(crate) fn give_up(&mut self, context: &str, error: Error) -> Result<EntryOutcome> {
        Ok(self
            .on_error(context, error, false)?
            .unwrap_or(EntryOutcome::Skipped))
    }

    /// Runs `op` until it succeeds or the policy stops retrying.
    pub(crate) fn with_retry<T>(
        &mut self,
        context: &str,
        mut op: impl FnMut(&dyn FileSystem) -> std::io::Result<T>,
    ) -> Result<std::result::Result<T, EntryOutcome>> {
        loop {
            match op(self.fs.as_ref()) {
                Ok(value) => return Ok(Ok(value)),
                Err(e) => {
                    if let Some(outcome) = self.on_error(context, Error::Io(e), true)? {
                        return Ok(Err(outcome));
                    }
                    log::debug!("retrying {}", context);
                }
            }
        }
    }

    /// Finds a password that unlocks an entry.
    ///
    /// Cached passwords are tried first, then the prompt is asked until it
    /// supplies one that `try_password` accepts or gives up.
    pub(crate) fn unlock(
        &mut self,
        entry_name: &str,
        try_password: &mut dyn FnMut(&Password) -> Option<EntryCipher>,
    ) -> Unlocked {
        if let Some(cipher) = self.passwords.iter().find_map(|p| try_password(p)) {
            return Unlocked::Cipher(cipher);
        }

        let mut rejected = !self.passwords.is_empty();
        loop {
            let reply = self.password_prompt.prompt_password(entry_name);
            let error = || {
                if rejected {
                    Error::WrongPassword {
                        entry_name: entry_name.to_string(),
                    }
                } else {
                    Error::PasswordRequired {
                        entry_name: entry_name.to_string(),
                    }
                }
            };
            match reply {
                PasswordReply::Password(password) => {
                    if let Some(cipher) = try_password(&password) {
                        self.passwords.insert(password);
                        return Unlocked::Cipher(cipher);
                    }
                    log::warn!("Wrong password for '{}'", entry_name);
                    rejected = true;
                }
                PasswordReply::Skip => {
                    return Unlocked::Done(EntryOutcome::Failed(error()));
                }
                PasswordReply::Cancel => {
                    log::debug!("password prompt cancelled for '{}'", entry_name);
                    return Unlocked::Done(EntryOutcome::Declined);
                }
                PasswordReply::SkipAll => {
                    self.policy.skip_all(ErrorCategory::Encrypted);
                    return Unlocked::Done(EntryOutcome::Failed(error()));
                }
            }
        }
    }

    /// Deletes a partially written output file.
    pub(crate) fn discard(&self, path: &Path) {
        if let Err(e) = self.fs.remove_file(path) {
            log::warn!("Failed to clean up partial file '{}': {}", path.display(), e);
        }
    }
}
