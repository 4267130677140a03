//! Stored entries.

use super::{DecodeResult, Decoder, Flush, Refill};

/// Copies stored data through the input buffer.
pub struct StoreDecoder<'a> {
    buf: &'a mut [u8],
}

impl<'a> StoreDecoder<'a> {
    /// Creates a decoder using `buf` for transfers.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf }
    }
}

impl Decoder for StoreDecoder<'_> {
    fn decode(&mut self, input: &mut dyn Refill, output: &mut dyn Flush) -> DecodeResult<()> {
        loop {
            let n = input.refill(self.buf)?;
            if n == 0 {
                return Ok(());
            }
            output.flush(&self.buf[..n])?;
        }
    }
}
