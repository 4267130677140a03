//! Error types for ZIP extraction.
//!
//! This module provides the [`Error`] enum which represents every failure mode
//! of the extraction engine, the [`ErrorCategory`] taxonomy used by the retry
//! policy, and a convenient [`Result<T>`] type alias.
//!
//! # Fatal, Recoverable and User-Initiated Errors
//!
//! Every error falls into exactly one of three buckets:
//!
//! | Bucket | How to recognize | Effect on an extraction run |
//! |--------|------------------|-----------------------------|
//! | Recoverable | [`Error::category`] returns `Some(_)` | Resolved per entry by the [`ErrorHandler`](crate::ErrorHandler) |
//! | User-initiated | [`Error::is_cancelled`] | Stops the run, reported as cancellation rather than failure |
//! | Fatal | [`Error::is_fatal`] | Aborts the whole call immediately |
//!
//! ```rust
//! use zunpack::{Error, ErrorCategory};
//!
//! let err = Error::CrcMismatch {
//!     entry_name: "docs/readme.txt".into(),
//!     expected: 0x1234_5678,
//!     actual: 0x8765_4321,
//! };
//! assert_eq!(err.category(), Some(ErrorCategory::Data));
//! assert!(!err.is_fatal());
//!
//! assert!(Error::OutOfMemory.is_fatal());
//! assert!(Error::Cancelled.is_cancelled());
//! ```

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Category of a recoverable, per-entry error.
///
/// Each category carries its own "skip all" flag in the
/// [`ErrorPolicy`](crate::policy::ErrorPolicy): once the user answers
/// [`Resolution::SkipAll`](crate::Resolution::SkipAll) for a category, every
/// later error of that category in the same run is skipped without prompting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Creating a directory or file, or reading or writing data, failed.
    Io,
    /// The target path is too long or cannot be represented on disk.
    LongName,
    /// The entry is encrypted and no usable password or AES metadata exists.
    Encrypted,
    /// The compressed stream is corrupt, its CRC or its authentication code is wrong.
    Data,
    /// The compression method is not supported.
    Method,
}

impl ErrorCategory {
    /// All categories, in declaration order.
    pub const ALL: [ErrorCategory; 5] = [
        ErrorCategory::Io,
        ErrorCategory::LongName,
        ErrorCategory::Encrypted,
        ErrorCategory::Data,
        ErrorCategory::Method,
    ];

    /// Returns the position of this category in [`ErrorCategory::ALL`].
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Io => "I/O error",
            ErrorCategory::LongName => "name too long",
            ErrorCategory::Encrypted => "encrypted entry",
            ErrorCategory::Data => "data error",
            ErrorCategory::Method => "unsupported method",
        };
        f.write_str(name)
    }
}

/// Error type for ZIP extraction operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical cause |
/// |----------|----------|---------------|
/// | Structure | [`InvalidFormat`][Self::InvalidFormat], [`CorruptHeader`][Self::CorruptHeader], [`UnexpectedEof`][Self::UnexpectedEof] | Damaged or truncated archive |
/// | Integrity | [`CorruptData`][Self::CorruptData], [`CrcMismatch`][Self::CrcMismatch], [`AuthenticationFailed`][Self::AuthenticationFailed] | Damaged entry data |
/// | Encryption | [`WrongPassword`][Self::WrongPassword], [`PasswordRequired`][Self::PasswordRequired], [`BadAesMetadata`][Self::BadAesMetadata] | Missing or wrong password |
/// | Compatibility | [`UnsupportedMethod`][Self::UnsupportedMethod], [`UnsupportedFeature`][Self::UnsupportedFeature] | Method not compiled in or unknown |
/// | Output | [`Io`][Self::Io], [`NameTooLong`][Self::NameTooLong], [`PathTraversal`][Self::PathTraversal] | Target filesystem |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while creating, writing or reading a file.
    ///
    /// Reading the archive itself reports a short read as
    /// [`UnexpectedEof`][Self::UnexpectedEof] instead.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not a ZIP archive or uses a structure this crate rejects.
    #[error("Invalid ZIP format: {0}")]
    InvalidFormat(String),

    /// A header record is corrupt or does not fit the bytes available.
    ///
    /// This covers the end-of-central-directory record, Zip64 records,
    /// central-directory records and local headers. A corrupt header stops
    /// the whole run.
    #[error("Corrupt header at offset {offset:#x}: {reason}")]
    CorruptHeader {
        /// The byte offset where corruption was detected.
        offset: u64,
        /// A description of the corruption.
        reason: String,
    },

    /// A single-volume archive ended in the middle of a record or entry.
    ///
    /// A truncated single-volume archive cannot be repaired by asking for
    /// another volume, so this error is fatal.
    #[error("Unexpected end of archive at offset {offset:#x}")]
    UnexpectedEof {
        /// Offset at which the read was attempted.
        offset: u64,
    },

    /// The entry uses a compression method this build cannot decode.
    ///
    /// Method numbers follow the ZIP application note: 0 store, 1 shrink,
    /// 2-5 reduce, 6 implode, 8 deflate, 9 deflate64, 12 bzip2, 99 AES.
    #[error("Unsupported compression method {method} for '{entry_name}'")]
    UnsupportedMethod {
        /// The entry name.
        entry_name: String,
        /// The method number from the header.
        method: u16,
    },

    /// The archive requires a feature that is not supported.
    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature {
        /// The name of the unsupported feature.
        feature: &'static str,
    },

    /// The compressed stream of an entry is corrupt or truncated.
    #[error("Corrupt data in '{entry_name}': {reason}")]
    CorruptData {
        /// The entry name.
        entry_name: String,
        /// What the decoder rejected.
        reason: String,
    },

    /// The CRC-32 of the decompressed data does not match the stored value.
    ///
    /// The extracted file is deleted when this error is reported outside
    /// of test mode.
    #[error(
        "CRC mismatch for '{entry_name}': expected {expected:#010x}, got {actual:#010x}"
    )]
    CrcMismatch {
        /// The entry name.
        entry_name: String,
        /// The CRC from the central directory.
        expected: u32,
        /// The CRC of the decompressed bytes.
        actual: u32,
    },

    /// The WinZip AES authentication code does not match.
    ///
    /// This is distinct from [`CrcMismatch`][Self::CrcMismatch]: it means the
    /// ciphertext was modified, not that decompression produced wrong bytes.
    #[error("Authentication code mismatch for '{entry_name}'")]
    AuthenticationFailed {
        /// The entry name.
        entry_name: String,
    },

    /// The AES extra field is missing or malformed.
    ///
    /// Reported when the extra field is absent, shorter than seven bytes, or
    /// declares a key strength outside `1..=3`. This is not a password error:
    /// no password can decrypt such an entry.
    #[error("Bad AES metadata for '{entry_name}': {reason}")]
    BadAesMetadata {
        /// The entry name.
        entry_name: String,
        /// What is wrong with the extra field.
        reason: String,
    },

    /// The supplied password failed the header check.
    #[error("Wrong password for '{entry_name}'")]
    WrongPassword {
        /// The entry name.
        entry_name: String,
    },

    /// The entry is encrypted and no password was supplied.
    #[error("Password required for '{entry_name}'")]
    PasswordRequired {
        /// The entry name.
        entry_name: String,
    },

    /// The target path exceeds the maximum path length.
    #[error("Target path too long ({} > {limit}): {}", path.as_os_str().len(), path.display())]
    NameTooLong {
        /// The path that would have been created.
        path: PathBuf,
        /// The limit in bytes.
        limit: usize,
    },

    /// The entry name would escape the target directory.
    #[error("Path traversal detected in entry: {entry_name}")]
    PathTraversal {
        /// The sanitized entry name.
        entry_name: String,
    },

    /// No entry matches the requested name or index.
    #[error("Entry not found: {name}")]
    EntryNotFound {
        /// The requested name.
        name: String,
    },

    /// A volume of a spanned archive could not be obtained.
    ///
    /// Returned when the volume prompt is cancelled or the volume cannot be
    /// opened. This fails only the entry being read.
    #[error("Volume {volume} is missing: {}", path.display())]
    VolumeMissing {
        /// The 1-based volume number.
        volume: u32,
        /// The path that was suggested or tried.
        path: PathBuf,
    },

    /// Memory for a working buffer could not be allocated.
    #[error("Out of memory")]
    OutOfMemory,

    /// The operation was cancelled by the user.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Returns the policy category for recoverable errors.
    ///
    /// Returns `None` for fatal errors and for [`Error::Cancelled`].
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Error::Io(_) | Error::VolumeMissing { .. } => Some(ErrorCategory::Io),
            Error::NameTooLong { .. } | Error::PathTraversal { .. } => {
                Some(ErrorCategory::LongName)
            }
            Error::WrongPassword { .. }
            | Error::PasswordRequired { .. }
            | Error::BadAesMetadata { .. } => Some(ErrorCategory::Encrypted),
            Error::CorruptData { .. }
            | Error::CrcMismatch { .. }
            | Error::AuthenticationFailed { .. } => Some(ErrorCategory::Data),
            Error::UnsupportedMethod { .. } => Some(ErrorCategory::Method),
            Error::InvalidFormat(_)
            | Error::CorruptHeader { .. }
            | Error::UnexpectedEof { .. }
            | Error::UnsupportedFeature { .. }
            | Error::EntryNotFound { .. }
            | Error::OutOfMemory
            | Error::Cancelled => None,
        }
    }

    /// Returns `true` if this error aborts the whole extraction call.
    ///
    /// # Example
    ///
    /// ```rust
    /// use zunpack::Error;
    ///
    /// assert!(Error::UnexpectedEof { offset: 100 }.is_fatal());
    /// assert!(!Error::Cancelled.is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        self.category().is_none()
            && !matches!(self, Error::Cancelled | Error::EntryNotFound { .. })
    }

    /// Returns `true` if the user cancelled the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Creates a CorruptHeader error.
    pub fn corrupt_header(offset: u64, reason: impl Into<String>) -> Self {
        Error::CorruptHeader {
            offset,
            reason: reason.into(),
        }
    }

    /// Creates a CorruptData error.
    pub fn corrupt_data(entry_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CorruptData {
            entry_name: entry_name.into(),
            reason: reason.into(),
        }
    }
}

/// A specialized Result type for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;
