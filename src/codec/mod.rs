//! Decoder engines for ZIP compression methods.
//!
//! Every decoder pulls compressed bytes through a [`Refill`] and pushes
//! decompressed bytes through a [`Flush`]. The extraction session implements
//! both: its refill limits reads to the entry's compressed size and decrypts
//! in place, its flush updates the CRC, writes the output and reports
//! progress.
//!
//! Buffers live in [`DecodeBuffers`], allocated once per extraction and
//! reused for every entry.

pub mod bits;
#[cfg(feature = "bzip2")]
mod bzip2;
mod explode;
pub mod huffman;
pub mod inflate;
mod store;
mod unreduce;
mod unshrink;
pub mod window;

use crate::format::{flags, method};
use crate::{Error, INPUT_BUFFER_SIZE, STAGING_BUFFER_SIZE};

#[cfg(feature = "bzip2")]
pub use self::bzip2::Bzip2Decoder;
pub use explode::ExplodeDecoder;
pub use inflate::{FixedTableCache, InflateDecoder};
pub use store::StoreDecoder;
pub use unreduce::UnreduceDecoder;
pub use unshrink::UnshrinkDecoder;
pub use window::Window;

/// Failure inside a decoder.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The compressed stream is invalid.
    #[error("corrupt data: {0}")]
    Corrupt(String),

    /// The compressed stream ended before the decoder finished.
    #[error("compressed data ended unexpectedly")]
    Truncated,

    /// A buffer could not be allocated.
    #[error("out of memory")]
    OutOfMemory,

    /// The WinZip AES authentication code did not match.
    #[error("authentication code mismatch")]
    Authentication,

    /// Reading compressed data failed.
    #[error("read failed: {0}")]
    Input(#[source] Error),

    /// Writing decompressed data failed.
    #[error("write failed: {0}")]
    Output(#[source] Error),

    /// The progress reporter asked to stop.
    #[error("cancelled")]
    Cancelled,
}

impl DecodeError {
    /// Creates a [`DecodeError::Corrupt`].
    pub fn corrupt(reason: impl Into<String>) -> Self {
        DecodeError::Corrupt(reason.into())
    }
}

/// Result type for decoders.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Source of compressed bytes for one entry.
pub trait Refill {
    /// Fills `buf` with up to `buf.len()` bytes.
    ///
    /// Returns `Ok(0)` once the entry's compressed data is exhausted.
    fn refill(&mut self, buf: &mut [u8]) -> DecodeResult<usize>;
}

/// Sink for decompressed bytes of one entry.
pub trait Flush {
    /// Consumes `data`.
    fn flush(&mut self, data: &[u8]) -> DecodeResult<()>;
}

/// A decompression engine.
pub trait Decoder {
    /// Decodes the whole entry.
    fn decode(&mut self, input: &mut dyn Refill, output: &mut dyn Flush) -> DecodeResult<()>;
}

/// Decompression method of an entry, with the flag bits it depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Method 0.
    Store,
    /// Method 1.
    Shrink,
    /// Methods 2 to 5, carrying the compression factor 1 to 4.
    Reduce(u8),
    /// Method 6.
    Implode {
        /// 8 KiB dictionary (flag bit 1).
        large_dictionary: bool,
        /// Literal tree present (flag bit 2).
        literal_tree: bool,
    },
    /// Method 8.
    Deflate,
    /// Method 9.
    Deflate64,
    /// Method 12.
    Bzip2,
}

impl Method {
    /// Maps a method number and general purpose flags to a decoder.
    ///
    /// Returns `None` for methods without a decoder in this build.
    pub fn from_entry(method_id: u16, general_flags: u16) -> Option<Self> {
        match method_id {
            method::STORED => Some(Method::Store),
            method::SHRUNK => Some(Method::Shrink),
            method::REDUCED1..=method::REDUCED4 => Some(Method::Reduce((method_id - 1) as u8)),
            method::IMPLODED => Some(Method::Implode {
                large_dictionary: general_flags & flags::IMPLODE_8K_DICTIONARY != 0,
                literal_tree: general_flags & flags::IMPLODE_LITERAL_TREE != 0,
            }),
            method::DEFLATED => Some(Method::Deflate),
            method::DEFLATE64 => Some(Method::Deflate64),
            #[cfg(feature = "bzip2")]
            method::BZIP2 => Some(Method::Bzip2),
            _ => None,
        }
    }
}

/// Buffers shared by all entries of one extraction.
pub struct DecodeBuffers {
    /// Compressed input.
    pub input: Box<[u8]>,
    /// Sliding window for LZ77-style decoders.
    pub window: Window,
    /// Output staging for decoders without a window.
    pub staging: Box<[u8]>,
}

impl std::fmt::Debug for DecodeBuffers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeBuffers").finish_non_exhaustive()
    }
}

/// Allocates a zeroed buffer, reporting failure instead of aborting.
pub(crate) fn try_alloc(len: usize) -> DecodeResult<Box<[u8]>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| DecodeError::OutOfMemory)?;
    v.resize(len, 0);
    Ok(v.into_boxed_slice())
}

impl DecodeBuffers {
    /// Allocates the buffers.
    pub fn new() -> DecodeResult<Self> {
        Ok(Self {
            input: try_alloc(INPUT_BUFFER_SIZE)?,
            window: Window::new()?,
            staging: try_alloc(STAGING_BUFFER_SIZE)?,
        })
    }
}

/// Runs the decoder for `method` over one entry.
///
/// `size` is the uncompressed size; decoders without an end marker stop
/// after producing that many bytes.
pub fn decode_entry(
    method: Method,
    size: u64,
    buffers: &mut DecodeBuffers,
    tables: &mut FixedTableCache,
    input: &mut dyn Refill,
    output: &mut dyn Flush,
) -> DecodeResult<()> {
    log::trace!("decoding {:?}, {} bytes", method, size);
    let DecodeBuffers {
        input: input_buf,
        window,
        staging,
    } = buffers;
    window.reset();
    match method {
        Method::Store => StoreDecoder::new(input_buf).decode(input, output),
        Method::Shrink => UnshrinkDecoder::new(input_buf, staging, size)?.decode(input, output),
        Method::Reduce(factor) => {
            UnreduceDecoder::new(input_buf, window, factor, size).decode(input, output)
        }
        Method::Implode {
            large_dictionary,
            literal_tree,
        } => ExplodeDecoder::new(input_buf, window, large_dictionary, literal_tree, size)
            .decode(input, output),
        Method::Deflate => {
            InflateDecoder::new(input_buf, window, tables.get(false)?, false).decode(input, output)
        }
        Method::Deflate64 => {
            InflateDecoder::new(input_buf, window, tables.get(true)?, true).decode(input, output)
        }
        #[cfg(feature = "bzip2")]
        Method::Bzip2 => Bzip2Decoder::new(input_buf, staging).decode(input, output),
        #[cfg(not(feature = "bzip2"))]
        Method::Bzip2 => Err(DecodeError::corrupt("bzip2 support not compiled in")),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_mapping() {
        assert_eq!(Method::from_entry(0, 0), Some(Method::Store));
        assert_eq!(Method::from_entry(2, 0), Some(Method::Reduce(1)));
        assert_eq!(Method::from_entry(5, 0), Some(Method::Reduce(4)));
        assert_eq!(
            Method::from_entry(6, flags::IMPLODE_8K_DICTIONARY),
            Some(Method::Implode {
                large_dictionary: true,
                literal_tree: false
            })
        );
        assert_eq!(Method::from_entry(9, 0), Some(Method::Deflate64));
        assert_eq!(Method::from_entry(14, 0), None);
        assert_eq!(Method::from_entry(99, 0), None);
    }
}
