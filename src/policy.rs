//! Error and retry policy for extraction runs.
//!
//! Recoverable errors are routed through an [`ErrorPolicy`], which keeps one
//! "skip all" flag per [`ErrorCategory`] and otherwise asks the host's
//! [`ErrorHandler`] what to do.
//!
//! # Example
//!
//! ```rust
//! use zunpack::{ErrorCategory, ErrorHandler, Resolution};
//!
//! /// Skips every data error without asking again, retries I/O once.
//! struct Lenient {
//!     retried: bool,
//! }
//!
//! impl ErrorHandler for Lenient {
//!     fn resolve_error(
//!         &mut self,
//!         category: ErrorCategory,
//!         _context: &str,
//!         _message: &str,
//!         retry_allowed: bool,
//!     ) -> Resolution {
//!         match category {
//!             ErrorCategory::Io if retry_allowed && !self.retried => {
//!                 self.retried = true;
//!                 Resolution::Retry
//!             }
//!             ErrorCategory::Data => Resolution::SkipAll,
//!             _ => Resolution::Skip,
//!         }
//!     }
//! }
//! ```

use crate::error::{Error, ErrorCategory};

/// Decision returned by an [`ErrorHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Repeat the failed operation. Only honored when retry was offered.
    Retry,
    /// Skip the current entry.
    Skip,
    /// Skip the current entry and every later error of the same category.
    SkipAll,
    /// Abort the remaining entries of this run.
    Cancel,
}

/// Host callback deciding how a recoverable error is handled.
pub trait ErrorHandler {
    /// Decides how to handle an error.
    ///
    /// `context` names the entry or path involved and `message` is the
    /// rendered error. `retry_allowed` is `true` only for operations that
    /// may succeed when repeated (directory and file creation).
    fn resolve_error(
        &mut self,
        category: ErrorCategory,
        context: &str,
        message: &str,
        retry_allowed: bool,
    ) -> Resolution;
}

/// Error handler that logs every error and skips the entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipErrors;

impl ErrorHandler for SkipErrors {
    fn resolve_error(
        &mut self,
        category: ErrorCategory,
        context: &str,
        message: &str,
        _retry_allowed: bool,
    ) -> Resolution {
        log::warn!("{}: {}: {}", category, context, message);
        Resolution::Skip
    }
}

impl<F> ErrorHandler for F
where
    F: FnMut(ErrorCategory, &str, &str, bool) -> Resolution,
{
    fn resolve_error(
        &mut self,
        category: ErrorCategory,
        context: &str,
        message: &str,
        retry_allowed: bool,
    ) -> Resolution {
        self(category, context, message, retry_allowed)
    }
}

/// Per-run skip-all state.
#[derive(Debug, Default, Clone)]
pub struct ErrorPolicy {
    skip_all: [bool; ErrorCategory::ALL.len()],
}

impl ErrorPolicy {
    /// Creates a policy with no category skipped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if every error of `category` is skipped silently.
    pub fn is_skipping(&self, category: ErrorCategory) -> bool {
        self.skip_all[category.index()]
    }

    /// Marks `category` as skipped for the rest of the run.
    pub fn skip_all(&mut self, category: ErrorCategory) {
        self.skip_all[category.index()] = true;
    }

    /// Resolves a recoverable error.
    ///
    /// Returns [`Resolution::Skip`] without calling `handler` when the
    /// category is already skipped. A [`Resolution::Retry`] answer for an
    /// operation that offered no retry is treated as [`Resolution::Skip`].
    pub fn resolve(
        &mut self,
        handler: &mut dyn ErrorHandler,
        category: ErrorCategory,
        context: &str,
        error: &Error,
        retry_allowed: bool,
    ) -> Resolution {
        if self.is_skipping(category) {
            log::debug!("skipping {} ({}): {}", context, category, error);
            return Resolution::Skip;
        }

        let message = error.to_string();
        match handler.resolve_error(category, context, &message, retry_allowed) {
            Resolution::Retry if !retry_allowed => {
                log::warn!("retry is not available for {}, skipping {}", category, context);
                Resolution::Skip
            }
            Resolution::SkipAll => {
                self.skip_all(category);
                Resolution::SkipAll
            }
            other => other,
        }
    }
}
