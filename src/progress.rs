//! Progress reporting for extraction runs.
//!
//! Progress is reported after every flushed output chunk, never per byte.
//! The return value of [`ProgressReporter::on_progress`] doubles as the only
//! cancellation signal: returning `false` stops the run, and the entry being
//! written is deleted.
//!
//! # Example
//!
//! ```rust,no_run
//! use zunpack::progress::progress_fn;
//! use zunpack::{ExtractOptions, Selection};
//!
//! let options = ExtractOptions::new().progress(progress_fn(|done, total| {
//!     println!("{done}/{total}");
//!     true
//! }));
//! let outcome = zunpack::extract("data.zip", "", "out", &Selection::All, options)?;
//! # Ok::<(), zunpack::Error>(())
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Progress callbacks for extraction and testing.
///
/// Every method has a default, so implementors override only what they need.
pub trait ProgressReporter {
    /// Called once before the first entry with the title of the operation and
    /// the total uncompressed size of all matched entries.
    fn on_open(&mut self, title: &str, total_bytes: u64) {
        let _ = (title, total_bytes);
    }

    /// Called after each processed chunk with the running byte count.
    ///
    /// Returns `true` to continue or `false` to cancel.
    fn on_progress(&mut self, bytes_done: u64, total_bytes: u64) -> bool {
        let _ = (bytes_done, total_bytes);
        true
    }

    /// Called when an entry starts.
    fn on_entry_start(&mut self, entry_name: &str, size: u64) {
        let _ = (entry_name, size);
    }

    /// Called when an entry is finished, skipped or failed.
    fn on_entry_complete(&mut self, entry_name: &str, success: bool) {
        let _ = (entry_name, success);
    }

    /// Called for non-fatal conditions worth showing to the user.
    fn on_warning(&mut self, message: &str) {
        let _ = message;
    }

    /// Called once when the operation ends, on every exit path.
    fn on_close(&mut self) {}
}

/// A progress reporter that does nothing.
#[derive(Debug, Default, Clone)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// Snapshot of what a [`StatisticsProgress`] has seen.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProgressState {
    /// Title passed to [`ProgressReporter::on_open`].
    pub title: String,
    /// Total bytes announced at open.
    pub total_bytes: u64,
    /// Last running byte count.
    pub processed_bytes: u64,
    /// Entry in flight, if any.
    pub current_entry: Option<String>,
    /// Entries that finished successfully.
    pub entries_succeeded: usize,
    /// Entries that failed or were skipped.
    pub entries_failed: usize,
    /// Warnings in the order they were reported.
    pub warnings: Vec<String>,
    /// Whether the run has ended.
    pub closed: bool,
}

/// Reporter recording counters and warnings.
///
/// Clones share one state, so a clone kept by the host can read the
/// statistics after the reporter was handed to an extraction.
#[derive(Debug, Default, Clone)]
pub struct StatisticsProgress {
    state: Arc<Mutex<ProgressState>>,
}

impl StatisticsProgress {
    /// Creates an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current statistics.
    pub fn snapshot(&self) -> ProgressState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn update(&self, f: impl FnOnce(&mut ProgressState)) {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

impl ProgressReporter for StatisticsProgress {
    fn on_open(&mut self, title: &str, total_bytes: u64) {
        self.update(|s| {
            s.title = title.to_string();
            s.total_bytes = total_bytes;
        });
    }

    fn on_progress(&mut self, bytes_done: u64, _total_bytes: u64) -> bool {
        self.update(|s| s.processed_bytes = bytes_done);
        true
    }

    fn on_entry_start(&mut self, entry_name: &str, _size: u64) {
        self.update(|s| s.current_entry = Some(entry_name.to_string()));
    }

    fn on_entry_complete(&mut self, _entry_name: &str, success: bool) {
        self.update(|s| {
            if success {
                s.entries_succeeded += 1;
            } else {
                s.entries_failed += 1;
            }
            s.current_entry = None;
        });
    }

    fn on_warning(&mut self, message: &str) {
        self.update(|s| s.warnings.push(message.to_string()));
    }

    fn on_close(&mut self) {
        self.update(|s| s.closed = true);
    }
}

/// A progress reporter shared through an [`Arc`].
///
/// Allows progress to be observed, and cancellation requested, from outside
/// the extraction call.
#[derive(Debug, Default)]
pub struct AtomicProgress {
    total_bytes: AtomicU64,
    processed_bytes: AtomicU64,
    cancelled: AtomicBool,
    closed: AtomicBool,
}

impl AtomicProgress {
    /// Creates a shared atomic progress reporter.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns total bytes to process.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    /// Returns processed bytes.
    pub fn processed_bytes(&self) -> u64 {
        self.processed_bytes.load(Ordering::Relaxed)
    }

    /// Requests cancellation at the next progress report.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Returns whether the operation has ended.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

impl ProgressReporter for Arc<AtomicProgress> {
    fn on_open(&mut self, _title: &str, total_bytes: u64) {
        self.total_bytes.store(total_bytes, Ordering::Relaxed);
    }

    fn on_progress(&mut self, bytes_done: u64, _total_bytes: u64) -> bool {
        self.processed_bytes.store(bytes_done, Ordering::Relaxed);
        !self.is_cancelled()
    }

    fn on_close(&mut self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}

/// A progress reporter that calls a closure.
pub struct ClosureProgress<F> {
    callback: F,
}

impl<F> ProgressReporter for ClosureProgress<F>
where
    F: FnMut(u64, u64) -> bool,
{
    fn on_progress(&mut self, bytes_done: u64, total_bytes: u64) -> bool {
        (self.callback)(bytes_done, total_bytes)
    }
}

/// Creates a closure-based progress reporter.
///
/// The closure receives `(bytes_done, total_bytes)` and returns `true` to
/// continue or `false` to cancel.
pub fn progress_fn<F>(f: F) -> ClosureProgress<F>
where
    F: FnMut(u64, u64) -> bool,
{
    ClosureProgress { callback: f }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_shared_between_clones() {
        let observer = StatisticsProgress::new();
        let mut progress = observer.clone();
        progress.on_open("Extracting", 1000);
        progress.on_entry_start("a.txt", 500);
        assert_eq!(observer.snapshot().current_entry.as_deref(), Some("a.txt"));
        assert!(progress.on_progress(250, 1000));
        progress.on_entry_complete("a.txt", true);
        progress.on_warning("b.txt: CRC mismatch");
        progress.on_entry_complete("b.txt", false);
        progress.on_close();

        let state = observer.snapshot();
        assert_eq!(state.title, "Extracting");
        assert_eq!(state.total_bytes, 1000);
        assert_eq!(state.processed_bytes, 250);
        assert_eq!(state.entries_succeeded, 1);
        assert_eq!(state.entries_failed, 1);
        assert_eq!(state.warnings, vec!["b.txt: CRC mismatch".to_string()]);
        assert_eq!(state.current_entry, None);
        assert!(state.closed);
    }

    #[test]
    fn test_atomic_progress_cancel() {
        let progress = AtomicProgress::shared();
        let mut reporter = Arc::clone(&progress);

        reporter.on_open("Testing", 1000);
        assert!(reporter.on_progress(500, 1000));
        assert_eq!(progress.total_bytes(), 1000);
        assert_eq!(progress.processed_bytes(), 500);

        progress.cancel();
        assert!(!reporter.on_progress(600, 1000));
        reporter.on_close();
        assert!(progress.is_closed());
    }

    #[test]
    fn test_closure_progress() {
        let mut calls = 0;
        let mut progress = progress_fn(|done, total| {
            calls += 1;
            done < total
        });
        assert!(progress.on_progress(50, 100));
        assert!(!progress.on_progress(100, 100));
        drop(progress);
        assert_eq!(calls, 2);
    }
}
