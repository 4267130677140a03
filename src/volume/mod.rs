//! Spanned (multi-volume) archive support.
//!
//! A spanned ZIP archive is split into several files. The end of central
//! directory record lives in the last one, which is the file a caller opens.
//! Entry data is addressed as `(disk, offset)` and reads that cross the end
//! of a volume continue on the next one.
//!
//! # Volume Naming
//!
//! Two conventions are recognized from the name of the last volume:
//! - WinZip: `archive.z01`, `archive.z02`, ..., `archive.zip`
//! - Sequential: `archive01.zip`, `archive02.zip`, ..., `archive03.zip`
//!
//! The host gets the derived name as a suggestion through
//! [`VolumePrompt`](crate::VolumePrompt) and may supply another path.
//!
//! # Ordering
//!
//! [`order_by_volume`] sorts selected entries by starting volume so each
//! volume is visited once per pass.

mod naming;
mod order;
mod reader;

pub use naming::{VolumeNames, VolumeNaming};
pub use order::order_by_volume;
pub use reader::{SpannedReader, VolumeState};
