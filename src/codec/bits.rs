//! LSB-first bit reader over a [`Refill`].

use super::{DecodeError, DecodeResult, Refill};

/// Reads bits least significant first, refilling its buffer on demand.
pub struct BitReader<'a> {
    source: &'a mut dyn Refill,
    buf: &'a mut [u8],
    pos: usize,
    len: usize,
    bit_buf: u64,
    bit_count: u32,
    eof: bool,
}

impl<'a> BitReader<'a> {
    /// Creates a reader that refills `buf` from `source`.
    pub fn new(source: &'a mut dyn Refill, buf: &'a mut [u8]) -> Self {
        Self {
            source,
            buf,
            pos: 0,
            len: 0,
            bit_buf: 0,
            bit_count: 0,
            eof: false,
        }
    }

    fn next_byte(&mut self) -> DecodeResult<Option<u8>> {
        if self.pos == self.len {
            if self.eof {
                return Ok(None);
            }
            self.len = self.source.refill(self.buf)?;
            self.pos = 0;
            if self.len == 0 {
                self.eof = true;
                return Ok(None);
            }
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(b))
    }

    /// Loads at least `n` bits, returning `false` at end of input.
    fn fill(&mut self, n: u32) -> DecodeResult<bool> {
        while self.bit_count < n {
            match self.next_byte()? {
                Some(b) => {
                    self.bit_buf |= u64::from(b) << self.bit_count;
                    self.bit_count += 8;
                }
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    fn take(&mut self, n: u32) -> u32 {
        let value = (self.bit_buf & ((1u64 << n) - 1)) as u32;
        self.bit_buf >>= n;
        self.bit_count -= n;
        value
    }

    /// Reads `n` bits (at most 32). Running out of input is
    /// [`DecodeError::Truncated`].
    pub fn bits(&mut self, n: u32) -> DecodeResult<u32> {
        debug_assert!(n <= 32);
        if !self.fill(n)? {
            return Err(DecodeError::Truncated);
        }
        Ok(self.take(n))
    }

    /// Reads `n` bits, or returns `None` if the input ends first.
    pub fn try_bits(&mut self, n: u32) -> DecodeResult<Option<u32>> {
        if !self.fill(n)? {
            return Ok(None);
        }
        Ok(Some(self.take(n)))
    }

    /// Discards bits up to the next byte boundary.
    pub fn align(&mut self) {
        let drop = self.bit_count % 8;
        self.bit_buf >>= drop;
        self.bit_count -= drop;
    }

    /// Reads eight bits.
    pub fn byte(&mut self) -> DecodeResult<u8> {
        Ok(self.bits(8)? as u8)
    }

    /// Aligns, then hands the next `n` bytes to `sink` in contiguous runs.
    pub fn read_aligned(
        &mut self,
        mut n: usize,
        mut sink: impl FnMut(&[u8]) -> DecodeResult<()>,
    ) -> DecodeResult<()> {
        self.align();
        while n > 0 && self.bit_count >= 8 {
            let b = self.take(8) as u8;
            sink(&[b])?;
            n -= 1;
        }
        while n > 0 {
            if self.pos == self.len {
                match self.next_byte()? {
                    Some(_) => self.pos -= 1,
                    None => return Err(DecodeError::Truncated),
                }
            }
            let run = (self.len - self.pos).min(n);
            sink(&self.buf[self.pos..self.pos + run])?;
            self.pos += run;
            n -= run;
        }
        Ok(())
    }
}
