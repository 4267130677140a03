//! Archive information and run result types.

use crate::Error;

/// Information about an opened archive.
#[derive(Debug, Clone, Default)]
pub struct ArchiveInfo {
    /// Total number of entries (files and directories).
    pub entry_count: usize,
    /// Number of directory entries.
    pub directory_count: usize,
    /// Total uncompressed size of all files.
    pub total_size: u64,
    /// Total compressed size of all entries.
    pub packed_size: u64,
    /// Whether any entries are encrypted.
    pub has_encrypted_entries: bool,
    /// Whether the archive spans several volumes.
    pub is_multi_volume: bool,
    /// Whether a Zip64 end of central directory record was found.
    pub is_zip64: bool,
    /// Bytes preceding the archive data, such as an SFX stub.
    pub prefix_bytes: u64,
    /// Compression method numbers used, in order of first appearance.
    pub methods: Vec<u16>,
    /// Archive comment (if any).
    pub comment: Option<String>,
}

impl ArchiveInfo {
    /// Returns the compression ratio (packed / unpacked).
    pub fn compression_ratio(&self) -> f64 {
        if self.total_size == 0 {
            1.0
        } else {
            self.packed_size as f64 / self.total_size as f64
        }
    }

    /// Returns the archive comment, if any.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

/// How an extraction run ended.
#[derive(Debug, Default)]
pub enum ExtractOutcome {
    /// Every selected entry was processed. Some may have failed or been
    /// skipped; see the counters.
    #[default]
    Success,
    /// The run was stopped by the progress reporter, a handler or a prompt.
    Cancelled,
    /// The archive turned out to be unreadable partway through.
    FatalCorruption(Error),
}

impl ExtractOutcome {
    /// Returns true for [`ExtractOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Outcome of processing a single entry.
#[derive(Debug)]
pub enum EntryOutcome {
    /// The entry was extracted or verified.
    Success,
    /// The entry was skipped without an error (existing file, skip-all).
    Skipped,
    /// The entry failed and the policy chose to skip it.
    Failed(Error),
    /// The user cancelled the password prompt for this entry. The run
    /// goes on and the entry is not reported as a failure.
    Declined,
    /// The user cancelled the run.
    Cancelled,
}

/// Result of extracting entries from an archive.
#[must_use = "extraction results should be checked for warnings or partial failures"]
#[derive(Debug, Default)]
pub struct ExtractResult {
    /// How the run ended.
    pub outcome: ExtractOutcome,
    /// Number of entries extracted.
    pub entries_extracted: usize,
    /// Number of entries skipped.
    pub entries_skipped: usize,
    /// Number of entries that failed.
    pub entries_failed: usize,
    /// Number of entries left alone because the password prompt was
    /// cancelled.
    pub entries_declined: usize,
    /// Total bytes written.
    pub bytes_extracted: u64,
    /// Detailed failures (entry path and error message).
    pub failures: Vec<(String, String)>,
}

impl ExtractResult {
    /// Returns true if the run completed and no entry failed.
    pub fn is_ok(&self) -> bool {
        self.outcome.is_success() && self.entries_failed == 0
    }

    /// Returns true if the run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, ExtractOutcome::Cancelled)
    }

    pub(crate) fn record(&mut self, name: &str, outcome: &EntryOutcome, bytes: u64) {
        match outcome {
            EntryOutcome::Success => {
                self.entries_extracted += 1;
                self.bytes_extracted += bytes;
            }
            EntryOutcome::Skipped => self.entries_skipped += 1,
            EntryOutcome::Failed(e) => {
                self.entries_failed += 1;
                self.failures.push((name.to_string(), e.to_string()));
            }
            EntryOutcome::Declined => self.entries_declined += 1,
            EntryOutcome::Cancelled => {}
        }
    }
}

/// Result of testing an archive for integrity.
#[must_use = "test results should be checked to verify archive integrity"]
#[derive(Debug, Default)]
pub struct TestResult {
    /// How the run ended.
    pub outcome: ExtractOutcome,
    /// Number of entries tested.
    pub entries_tested: usize,
    /// Number of entries that passed.
    pub entries_passed: usize,
    /// Number of entries that failed or were skipped.
    pub entries_failed: usize,
    /// Number of entries not tested because the password prompt was
    /// cancelled.
    pub entries_declined: usize,
    /// Detailed failures (entry path and error message).
    pub failures: Vec<(String, String)>,
}

impl TestResult {
    /// Returns true if the run completed and every tested entry passed.
    pub fn all_files_ok(&self) -> bool {
        self.outcome.is_success() && self.entries_failed == 0
    }
}

impl From<ExtractResult> for TestResult {
    fn from(result: ExtractResult) -> Self {
        let failed = result.entries_failed + result.entries_skipped;
        Self {
            outcome: result.outcome,
            entries_tested: result.entries_extracted + failed,
            entries_passed: result.entries_extracted,
            entries_failed: failed,
            entries_declined: result.entries_declined,
            failures: result.failures,
        }
    }
}
