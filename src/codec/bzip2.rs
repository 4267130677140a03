//! BZip2 entries (method 12).

use bzip2::{Decompress, Status};

use super::{DecodeError, DecodeResult, Decoder, Flush, Refill};

/// Drives a bzip2 stream decompressor between the input and staging
/// buffers.
pub struct Bzip2Decoder<'a> {
    input_buf: &'a mut [u8],
    staging: &'a mut [u8],
}

impl std::fmt::Debug for Bzip2Decoder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bzip2Decoder").finish_non_exhaustive()
    }
}

impl<'a> Bzip2Decoder<'a> {
    /// Creates a decoder.
    pub fn new(input_buf: &'a mut [u8], staging: &'a mut [u8]) -> Self {
        Self { input_buf, staging }
    }
}

impl Decoder for Bzip2Decoder<'_> {
    fn decode(&mut self, input: &mut dyn Refill, output: &mut dyn Flush) -> DecodeResult<()> {
        let mut stream = Decompress::new(false);
        let mut pos = 0;
        let mut len = 0;
        let mut eof = false;

        loop {
            if pos == len && !eof {
                len = input.refill(self.input_buf)?;
                pos = 0;
                eof = len == 0;
            }

            let in_before = stream.total_in();
            let out_before = stream.total_out();
            let status = stream
                .decompress(&self.input_buf[pos..len], self.staging)
                .map_err(|e| DecodeError::corrupt(format!("bzip2: {}", e)))?;
            let consumed = (stream.total_in() - in_before) as usize;
            let produced = (stream.total_out() - out_before) as usize;
            pos += consumed;

            if produced > 0 {
                output.flush(&self.staging[..produced])?;
            }
            if let Status::StreamEnd = status {
                return Ok(());
            }
            if consumed == 0 && produced == 0 {
                if eof {
                    return Err(DecodeError::Truncated);
                }
                if pos < len {
                    return Err(DecodeError::corrupt("bzip2 stream stalled"));
                }
            }
        }
    }
}
