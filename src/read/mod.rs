//! Archive reading API: opening, selecting, extracting and testing.
//!
//! # Example
//!
//! ```rust,no_run
//! use zunpack::read::{ExtractOptions, OverwritePolicy, Selection, ZipArchive};
//!
//! let mut archive = ZipArchive::open_path("archive.zip")?;
//!
//! for entry in archive.entries() {
//!     println!("{}: {} bytes", entry.name, entry.size);
//! }
//!
//! let options = ExtractOptions::new().overwrite(OverwritePolicy::Skip);
//! let result = archive.extract("out", "", &Selection::Masks("*.txt".into()), options);
//! for (name, reason) in &result.failures {
//!     eprintln!("{name}: {reason}");
//! }
//! # Ok::<(), zunpack::Error>(())
//! ```

mod archive;
mod entry;
mod extraction;
mod info;
mod metadata;
mod options;
mod path_safety;
pub(crate) mod selection;
mod session;

pub use archive::ZipArchive;
pub use entry::DirectoryEntry;
pub use info::{ArchiveInfo, EntryOutcome, ExtractOutcome, ExtractResult, TestResult};
pub use options::{ExtractOptions, OverwritePolicy, PreserveMetadata};
pub use selection::{MaskSet, SelectedItem, Selection, find_single, match_entries, total_bytes};
pub use session::{ExtractRequest, ExtractSession};
