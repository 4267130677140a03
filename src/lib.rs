//! # zunpack
//!
//! A pure-Rust ZIP extraction engine.
//!
//! The crate reads the central directory of a ZIP archive (Zip64, spanned
//! volumes and self-extractor prefixes included), selects entries by mask,
//! explicit list or single name, and streams each entry through one of the
//! supported decoders into a file system abstraction. Legacy PKWARE methods
//! are supported alongside deflate, and encrypted entries can be opened
//! with the traditional stream cipher or WinZip AES.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use zunpack::{ExtractOptions, Result, Selection};
//!
//! fn main() -> Result<()> {
//!     let result = zunpack::extract(
//!         "archive.zip",
//!         "",
//!         "./output",
//!         &Selection::All,
//!         ExtractOptions::new(),
//!     )?;
//!     println!(
//!         "{} extracted, {} skipped, {} failed",
//!         result.entries_extracted, result.entries_skipped, result.entries_failed
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ### Password-Protected Entries
//!
//! ```rust,no_run
//! use zunpack::{ExtractOptions, PasswordReply, Selection};
//!
//! let options = ExtractOptions::new()
//!     .password("first guess")
//!     .password_prompt(|entry: &str| {
//!         eprintln!("password needed for {entry}");
//!         PasswordReply::Skip
//!     });
//! let result = zunpack::extract("secret.zip", "", "out", &Selection::All, options)?;
//! # Ok::<(), zunpack::Error>(())
//! ```
//!
//! ### Testing an Archive
//!
//! ```rust,no_run
//! use zunpack::ExtractOptions;
//!
//! let result = zunpack::test_archive("archive.zip", "*.*", ExtractOptions::new())?;
//! if !result.all_files_ok() {
//!     for (name, reason) in &result.failures {
//!         eprintln!("{name}: {reason}");
//!     }
//! }
//! # Ok::<(), zunpack::Error>(())
//! ```
//!
//! ## Supported Methods
//!
//! | Method | ID | Notes |
//! |--------|----|-------|
//! | Store | 0 | |
//! | Shrink | 1 | LZW, 9 to 13 bit codes |
//! | Reduce | 2-5 | Compression factors 1 to 4 |
//! | Implode | 6 | 4 or 8 KiB dictionary, optional literal tree |
//! | Deflate | 8 | |
//! | Deflate64 | 9 | 64 KiB window |
//! | BZip2 | 12 | `bzip2` feature |
//! | WinZip AES | 99 | `aes` feature, wraps any method above |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `aes` | Yes | WinZip AES decryption (AE-1 and AE-2) |
//! | `bzip2` | Yes | BZip2 decompression |
//!
//! Without a feature, entries using it fail with
//! [`Error::UnsupportedMethod`] and the rest of the archive is unaffected.
//!
//! ## Error Handling
//!
//! Every entry failure is classified into an [`ErrorCategory`] and handed
//! to the [`ErrorHandler`], which may retry (for directory and file
//! creation), skip, skip the whole category, or cancel. Errors without a
//! category mean the archive itself is unreadable and end the run with
//! [`ExtractOutcome::FatalCorruption`].
//!
//! ## Host Callbacks
//!
//! Progress, password prompts, error decisions, volume changes and file
//! access are traits ([`ProgressReporter`], [`PasswordPrompt`],
//! [`ErrorHandler`], [`VolumePrompt`], [`FileSystem`]) with
//! non-interactive defaults. Closures with the right signature implement
//! the prompt and handler traits directly.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

use std::path::Path;

/// Compressed input buffer size (16 KiB).
pub const INPUT_BUFFER_SIZE: usize = 16 * 1024;

/// Sliding window size, large enough for Deflate64 (64 KiB).
pub const WINDOW_SIZE: usize = 64 * 1024;

/// Output staging buffer for decoders without a window (16 KiB).
pub const STAGING_BUFFER_SIZE: usize = 16 * 1024;

/// Largest name plus extra field accepted in a local header.
pub const MAX_HEADER_SIZE: usize = 64 * 1024;

/// Default limit on target path length, in bytes.
pub const DEFAULT_MAX_PATH: usize = 260;

/// Path length limit while testing, when nothing is written.
pub const TEST_MODE_MAX_PATH: usize = 1024;

pub mod checksum;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod format;
pub mod fs;
pub mod policy;
pub mod progress;
pub mod prompt;
pub mod read;
pub mod timestamp;
pub mod volume;

pub use crypto::Password;
pub use error::{Error, ErrorCategory, Result};
pub use fs::{FileSystem, StdFileSystem};
pub use policy::{ErrorHandler, ErrorPolicy, Resolution, SkipErrors};
pub use prompt::{AutoVolumes, NoPasswordPrompt, PasswordPrompt, PasswordReply, VolumePrompt};
pub use timestamp::DosDateTime;

// Re-export reading API at crate root for convenience
pub use read::{
    ArchiveInfo, DirectoryEntry, ExtractOptions, ExtractOutcome, ExtractRequest, ExtractResult,
    ExtractSession, OverwritePolicy, PreserveMetadata, SelectedItem, Selection, TestResult,
    ZipArchive,
};

// Re-export progress API
pub use progress::{
    AtomicProgress, NoProgress, ProgressReporter, ProgressState, StatisticsProgress, progress_fn,
};

/// Extracts the entries under `root` chosen by `selection` into `target_dir`.
///
/// `Err` is returned only when the archive cannot be opened or its central
/// directory cannot be read. Everything that happens afterwards, including
/// cancellation and corruption discovered mid-run, is reported in the
/// [`ExtractResult`].
pub fn extract(
    archive_path: impl AsRef<Path>,
    root: &str,
    target_dir: impl AsRef<Path>,
    selection: &Selection,
    mut options: ExtractOptions,
) -> Result<ExtractResult> {
    let mut archive = ZipArchive::open_for(archive_path.as_ref(), &mut options)?;
    Ok(archive.extract(target_dir, root, selection, options))
}

/// Extracts a single file, found by `name` and/or `item_index`, directly
/// into `target_dir`, optionally under a new name.
///
/// Returns `Ok(())` when the file was written or deliberately skipped
/// (for instance by [`OverwritePolicy::Skip`]). `Err` carries the reason it
/// was not: [`Error::EntryNotFound`], [`Error::Cancelled`], or the error the
/// entry failed with.
pub fn extract_single(
    archive_path: impl AsRef<Path>,
    name: &str,
    item_index: Option<usize>,
    target_dir: impl AsRef<Path>,
    rename_to: Option<&str>,
    mut options: ExtractOptions,
) -> Result<()> {
    let mut archive = ZipArchive::open_for(archive_path.as_ref(), &mut options)?;
    archive.extract_single(name, item_index, target_dir, rename_to, options)
}

/// Decodes every entry matching `mask` and verifies its checksum without
/// writing anything.
pub fn test_archive(
    archive_path: impl AsRef<Path>,
    mask: &str,
    mut options: ExtractOptions,
) -> Result<TestResult> {
    let mut archive = ZipArchive::open_for(archive_path.as_ref(), &mut options)?;
    Ok(archive.test(mask, options))
}
