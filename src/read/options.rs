//! Extraction options.

use std::sync::Arc;

use crate::DEFAULT_MAX_PATH;
use crate::crypto::Password;
use crate::fs::{FileSystem, StdFileSystem};
use crate::policy::ErrorHandler;
use crate::progress::ProgressReporter;
use crate::prompt::{AutoVolumes, PasswordPrompt, VolumePrompt};

/// Policy for handling existing files during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Replace existing files.
    #[default]
    Overwrite,
    /// Leave existing files alone and count the entry as skipped.
    Skip,
    /// Report an I/O error for the entry.
    Error,
}

/// Which stored metadata is applied to extracted files and directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreserveMetadata {
    /// Set the modification time from the DOS timestamp.
    pub modification_time: bool,
    /// Apply DOS attributes or Unix permissions.
    pub attributes: bool,
}

impl Default for PreserveMetadata {
    fn default() -> Self {
        Self::all()
    }
}

impl PreserveMetadata {
    /// Preserve all available metadata.
    pub fn all() -> Self {
        Self {
            modification_time: true,
            attributes: true,
        }
    }

    /// Preserve no metadata.
    pub fn none() -> Self {
        Self {
            modification_time: false,
            attributes: false,
        }
    }

    /// Preserve only the modification time.
    pub fn modification_time_only() -> Self {
        Self {
            modification_time: true,
            attributes: false,
        }
    }
}

/// Options for extraction and test runs.
///
/// Host callbacks default to non-interactive implementations: no progress,
/// no password prompt, errors are logged and skipped, and spanned volumes
/// are looked up next to the archive.
///
/// # Example
///
/// ```rust
/// use zunpack::read::{ExtractOptions, OverwritePolicy};
///
/// let options = ExtractOptions::new()
///     .overwrite(OverwritePolicy::Skip)
///     .password("secret")
///     .max_path_len(1024);
/// assert_eq!(options.overwrite, OverwritePolicy::Skip);
/// ```
pub struct ExtractOptions {
    /// Policy for handling existing files.
    pub overwrite: OverwritePolicy,
    /// Metadata preservation options.
    pub preserve_metadata: PreserveMetadata,
    /// Password tried before prompting.
    pub password: Option<Password>,
    /// Longest target path accepted, in bytes.
    pub max_path_len: usize,
    /// Title passed to [`ProgressReporter::on_open`].
    pub progress_title: Option<String>,
    /// Progress reporter (optional).
    pub progress: Option<Box<dyn ProgressReporter>>,
    /// Password prompt (optional).
    pub password_prompt: Option<Box<dyn PasswordPrompt>>,
    /// Error handler (optional).
    pub error_handler: Option<Box<dyn ErrorHandler>>,
    /// Volume prompt for spanned archives (optional).
    pub volume_prompt: Option<Box<dyn VolumePrompt>>,
    /// File access (optional, defaults to [`StdFileSystem`]).
    pub file_system: Option<Arc<dyn FileSystem>>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            overwrite: OverwritePolicy::default(),
            preserve_metadata: PreserveMetadata::default(),
            password: None,
            max_path_len: DEFAULT_MAX_PATH,
            progress_title: None,
            progress: None,
            password_prompt: None,
            error_handler: None,
            volume_prompt: None,
            file_system: None,
        }
    }
}

impl std::fmt::Debug for ExtractOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractOptions")
            .field("overwrite", &self.overwrite)
            .field("preserve_metadata", &self.preserve_metadata)
            .field("password", &self.password)
            .field("max_path_len", &self.max_path_len)
            .field("progress_title", &self.progress_title)
            .finish_non_exhaustive()
    }
}

impl ExtractOptions {
    /// Creates extraction options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the overwrite policy.
    pub fn overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }

    /// Sets the metadata preservation options.
    pub fn preserve_metadata(mut self, preserve: PreserveMetadata) -> Self {
        self.preserve_metadata = preserve;
        self
    }

    /// Seeds the password cache.
    pub fn password(mut self, password: impl Into<Password>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the longest accepted target path.
    pub fn max_path_len(mut self, len: usize) -> Self {
        self.max_path_len = len;
        self
    }

    /// Sets the title reported when the run starts.
    pub fn progress_title(mut self, title: impl Into<String>) -> Self {
        self.progress_title = Some(title.into());
        self
    }

    /// Sets the progress reporter.
    pub fn progress(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.progress = Some(Box::new(reporter));
        self
    }

    /// Sets the password prompt.
    pub fn password_prompt(mut self, prompt: impl PasswordPrompt + 'static) -> Self {
        self.password_prompt = Some(Box::new(prompt));
        self
    }

    /// Sets the error handler.
    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Some(Box::new(handler));
        self
    }

    /// Sets the volume prompt.
    pub fn volume_prompt(mut self, prompt: impl VolumePrompt + 'static) -> Self {
        self.volume_prompt = Some(Box::new(prompt));
        self
    }

    /// Sets the file system used for reading volumes and writing output.
    pub fn file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Returns the configured file system, or the standard one.
    pub(crate) fn resolved_file_system(&self) -> Arc<dyn FileSystem> {
        self.file_system
            .clone()
            .unwrap_or_else(|| Arc::new(StdFileSystem))
    }

    /// Takes the volume prompt out, leaving the default in its place.
    pub(crate) fn take_volume_prompt(&mut self) -> Box<dyn VolumePrompt> {
        self.volume_prompt
            .take()
            .unwrap_or_else(|| Box::new(AutoVolumes))
    }
}
