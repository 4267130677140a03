//! 64 KiB sliding window shared by the LZ77-style decoders.

use super::{DecodeError, DecodeResult, Flush, try_alloc};
use crate::WINDOW_SIZE;

/// Circular output window.
///
/// Bytes are flushed each time the window fills, so the last
/// [`WINDOW_SIZE`] bytes stay addressable for back-references.
pub struct Window {
    buf: Box<[u8]>,
    pos: usize,
    total: u64,
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("pos", &self.pos)
            .field("total", &self.total)
            .finish()
    }
}

impl Window {
    /// Allocates an empty window.
    pub fn new() -> DecodeResult<Self> {
        Ok(Self {
            buf: try_alloc(WINDOW_SIZE)?,
            pos: 0,
            total: 0,
        })
    }

    /// Forgets all output, ready for the next entry.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.total = 0;
    }

    /// Bytes produced since the last reset.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Appends one byte.
    #[inline]
    pub fn push(&mut self, byte: u8, out: &mut dyn Flush) -> DecodeResult<()> {
        self.buf[self.pos] = byte;
        self.pos += 1;
        self.total += 1;
        if self.pos == self.buf.len() {
            out.flush(&self.buf)?;
            self.pos = 0;
        }
        Ok(())
    }

    /// Appends a run of bytes.
    pub fn extend(&mut self, bytes: &[u8], out: &mut dyn Flush) -> DecodeResult<()> {
        for &b in bytes {
            self.push(b, out)?;
        }
        Ok(())
    }

    /// Copies `len` bytes starting `dist` bytes back.
    ///
    /// A reference before the first output byte is corrupt unless
    /// `zero_fill` is set, in which case the missing bytes read as zero.
    pub fn copy(
        &mut self,
        dist: usize,
        len: usize,
        zero_fill: bool,
        out: &mut dyn Flush,
    ) -> DecodeResult<()> {
        let size = self.buf.len();
        if dist == 0 || dist > size {
            return Err(DecodeError::corrupt(format!("invalid distance {}", dist)));
        }
        if dist as u64 > self.total && !zero_fill {
            return Err(DecodeError::corrupt("distance too far back"));
        }
        for _ in 0..len {
            let byte = if dist as u64 > self.total {
                0
            } else {
                self.buf[(self.pos + size - dist) % size]
            };
            self.push(byte, out)?;
        }
        Ok(())
    }

    /// Flushes the bytes not yet handed to `out`.
    pub fn finish(&mut self, out: &mut dyn Flush) -> DecodeResult<()> {
        if self.pos > 0 {
            out.flush(&self.buf[..self.pos])?;
            self.pos = 0;
        }
        Ok(())
    }
}
