//! Deflate and Deflate64 decoding (RFC 1951).
//!
//! Deflate64 widens the window to 64 KiB, gives length code 285 a base of 3
//! with 16 extra bits, and adds distance codes 30 and 31.

use std::sync::Arc;

use super::bits::BitReader;
use super::huffman::Huffman;
use super::window::Window;
use super::{DecodeError, DecodeResult, Decoder, Flush, Refill};

const MAX_LIT_LEN_CODES: usize = 286;
const FIXED_LIT_LEN_CODES: usize = 288;
const DEFLATE_DIST_CODES: usize = 30;
const DEFLATE64_DIST_CODES: usize = 32;
const CODE_LENGTH_CODES: usize = 19;

const LEN_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];
const LEN_EXTRA: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];
const DIST_BASE: [u32; 32] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577, 32769, 49153,
];
const DIST_EXTRA: [u8; 32] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13, 14, 14,
];
const CODE_LENGTH_ORDER: [usize; CODE_LENGTH_CODES] =
    [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];

/// Deflate64 length code 285.
const DEFLATE64_LONG_LEN_BASE: usize = 3;
const DEFLATE64_LONG_LEN_EXTRA: u32 = 16;

fn dist_codes(deflate64: bool) -> usize {
    if deflate64 {
        DEFLATE64_DIST_CODES
    } else {
        DEFLATE_DIST_CODES
    }
}

/// Literal/length and distance codes of fixed Huffman blocks.
#[derive(Debug)]
pub struct FixedTables {
    lit_len: Huffman,
    dist: Huffman,
}

impl FixedTables {
    fn build(deflate64: bool) -> DecodeResult<Self> {
        let mut lengths = [0u8; FIXED_LIT_LEN_CODES];
        lengths[..144].fill(8);
        lengths[144..256].fill(9);
        lengths[256..280].fill(7);
        lengths[280..].fill(8);
        let (lit_len, _) = Huffman::new(&lengths)?;
        let (dist, _) = Huffman::new(&vec![5u8; dist_codes(deflate64)])?;
        Ok(Self { lit_len, dist })
    }
}

/// Fixed tables built on first use and shared by every entry of a session.
#[derive(Debug, Default)]
pub struct FixedTableCache {
    deflate: Option<Arc<FixedTables>>,
    deflate64: Option<Arc<FixedTables>>,
}

impl FixedTableCache {
    /// Returns the fixed tables for Deflate or Deflate64.
    pub fn get(&mut self, deflate64: bool) -> DecodeResult<Arc<FixedTables>> {
        let slot = if deflate64 {
            &mut self.deflate64
        } else {
            &mut self.deflate
        };
        if let Some(tables) = slot {
            return Ok(Arc::clone(tables));
        }
        log::trace!("building fixed tables (deflate64: {})", deflate64);
        let tables = Arc::new(FixedTables::build(deflate64)?);
        *slot = Some(Arc::clone(&tables));
        Ok(tables)
    }

    /// Returns `true` once any table set has been built.
    pub fn is_built(&self) -> bool {
        self.deflate.is_some() || self.deflate64.is_some()
    }
}

/// Decoder for methods 8 and 9.
pub struct InflateDecoder<'a> {
    input_buf: &'a mut [u8],
    window: &'a mut Window,
    fixed: Arc<FixedTables>,
    deflate64: bool,
}

impl<'a> InflateDecoder<'a> {
    /// Creates a decoder writing through `window`.
    pub fn new(
        input_buf: &'a mut [u8],
        window: &'a mut Window,
        fixed: Arc<FixedTables>,
        deflate64: bool,
    ) -> Self {
        Self {
            input_buf,
            window,
            fixed,
            deflate64,
        }
    }
}

impl Decoder for InflateDecoder<'_> {
    fn decode(&mut self, input: &mut dyn Refill, output: &mut dyn Flush) -> DecodeResult<()> {
        let mut bits = BitReader::new(input, &mut *self.input_buf);
        let mut state = BlockState {
            window: &mut *self.window,
            deflate64: self.deflate64,
        };
        loop {
            let last = bits.bits(1)? == 1;
            match bits.bits(2)? {
                0 => state.stored(&mut bits, output)?,
                1 => {
                    let fixed = Arc::clone(&self.fixed);
                    state.codes(&mut bits, &fixed.lit_len, &fixed.dist, output)?
                }
                2 => {
                    let (lit_len, dist) = state.dynamic_tables(&mut bits)?;
                    state.codes(&mut bits, &lit_len, &dist, output)?
                }
                _ => return Err(DecodeError::corrupt("invalid block type")),
            }
            if last {
                break;
            }
        }
        state.window.finish(output)
    }
}

struct BlockState<'w> {
    window: &'w mut Window,
    deflate64: bool,
}

impl BlockState<'_> {
    fn stored(&mut self, bits: &mut BitReader<'_>, output: &mut dyn Flush) -> DecodeResult<()> {
        bits.align();
        let len = bits.bits(16)?;
        let nlen = bits.bits(16)?;
        if len != !nlen & 0xFFFF {
            return Err(DecodeError::corrupt("stored block length mismatch"));
        }
        let window = &mut *self.window;
        bits.read_aligned(len as usize, |chunk| window.extend(chunk, output))
    }

    fn codes(
        &mut self,
        bits: &mut BitReader<'_>,
        lit_len: &Huffman,
        dist: &Huffman,
        output: &mut dyn Flush,
    ) -> DecodeResult<()> {
        let max_dist = dist_codes(self.deflate64);
        loop {
            let symbol = lit_len.decode(bits, false)? as usize;
            if symbol < 256 {
                self.window.push(symbol as u8, output)?;
                continue;
            }
            if symbol == 256 {
                return Ok(());
            }
            let symbol = symbol - 257;
            if symbol >= LEN_BASE.len() {
                return Err(DecodeError::corrupt("invalid length code"));
            }
            let len = if self.deflate64 && symbol == LEN_BASE.len() - 1 {
                DEFLATE64_LONG_LEN_BASE + bits.bits(DEFLATE64_LONG_LEN_EXTRA)? as usize
            } else {
                LEN_BASE[symbol] as usize + bits.bits(u32::from(LEN_EXTRA[symbol]))? as usize
            };

            let symbol = dist.decode(bits, false)? as usize;
            if symbol >= max_dist {
                return Err(DecodeError::corrupt("invalid distance code"));
            }
            let distance =
                DIST_BASE[symbol] as usize + bits.bits(u32::from(DIST_EXTRA[symbol]))? as usize;
            self.window.copy(distance, len, false, output)?;
        }
    }

    fn dynamic_tables(&mut self, bits: &mut BitReader<'_>) -> DecodeResult<(Huffman, Huffman)> {
        let nlen = bits.bits(5)? as usize + 257;
        let ndist = bits.bits(5)? as usize + 1;
        let ncode = bits.bits(4)? as usize + 4;
        if nlen > MAX_LIT_LEN_CODES || ndist > dist_codes(self.deflate64) {
            return Err(DecodeError::corrupt("too many length or distance codes"));
        }

        let mut lengths = [0u8; MAX_LIT_LEN_CODES + DEFLATE64_DIST_CODES];
        for &index in &CODE_LENGTH_ORDER[..ncode] {
            lengths[index] = bits.bits(3)? as u8;
        }
        let (code_lengths, left) = Huffman::new(&lengths[..CODE_LENGTH_CODES])?;
        if left != 0 {
            return Err(DecodeError::corrupt("incomplete code length code"));
        }

        lengths = [0u8; MAX_LIT_LEN_CODES + DEFLATE64_DIST_CODES];
        let total = nlen + ndist;
        let mut index = 0;
        while index < total {
            let symbol = code_lengths.decode(bits, false)?;
            if symbol < 16 {
                lengths[index] = symbol as u8;
                index += 1;
                continue;
            }
            let (value, repeat) = match symbol {
                16 => {
                    if index == 0 {
                        return Err(DecodeError::corrupt("repeat with no previous length"));
                    }
                    (lengths[index - 1], 3 + bits.bits(2)? as usize)
                }
                17 => (0, 3 + bits.bits(3)? as usize),
                _ => (0, 11 + bits.bits(7)? as usize),
            };
            if index + repeat > total {
                return Err(DecodeError::corrupt("too many code lengths"));
            }
            lengths[index..index + repeat].fill(value);
            index += repeat;
        }
        if lengths[256] == 0 {
            return Err(DecodeError::corrupt("missing end-of-block code"));
        }

        let lit_len = Self::checked_code(&lengths[..nlen])?;
        let dist = Self::checked_code(&lengths[nlen..total])?;
        Ok((lit_len, dist))
    }

    /// Builds a code, allowing an incomplete one only when it has a single
    /// one-bit code.
    fn checked_code(lengths: &[u8]) -> DecodeResult<Huffman> {
        let (code, left) = Huffman::new(lengths)?;
        if left < 0
            || (left > 0
                && lengths.len() != usize::from(code.count(0)) + usize::from(code.count(1)))
        {
            return Err(DecodeError::corrupt("invalid literal/length or distance code"));
        }
        Ok(code)
    }
}
