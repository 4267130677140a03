//! Canonical prefix codes decoded one bit at a time.

use super::bits::BitReader;
use super::{DecodeError, DecodeResult};

/// Longest code length accepted (implode trees go up to 16).
pub const MAX_BITS: usize = 16;

/// Canonical code described by per-length counts and symbols in code order.
#[derive(Debug, Clone)]
pub struct Huffman {
    counts: [u16; MAX_BITS + 1],
    symbols: Vec<u16>,
}

impl Huffman {
    /// Builds a code from per-symbol lengths (0 means unused).
    ///
    /// Returns the code and the number of unused code slots: zero for a
    /// complete code, positive for an incomplete one and negative when the
    /// lengths are oversubscribed.
    pub fn new(lengths: &[u8]) -> DecodeResult<(Self, i32)> {
        let mut counts = [0u16; MAX_BITS + 1];
        for &len in lengths {
            let len = len as usize;
            if len > MAX_BITS {
                return Err(DecodeError::corrupt("code length too long"));
            }
            counts[len] += 1;
        }
        let mut code = Huffman {
            counts,
            symbols: vec![0; lengths.len()],
        };
        if counts[0] as usize == lengths.len() {
            return Ok((code, 0));
        }

        let mut left: i32 = 1;
        for &count in &counts[1..] {
            left <<= 1;
            left -= i32::from(count);
            if left < 0 {
                return Ok((code, left));
            }
        }

        let mut offsets = [0u16; MAX_BITS + 1];
        for len in 1..MAX_BITS {
            offsets[len + 1] = offsets[len] + counts[len];
        }
        for (symbol, &len) in lengths.iter().enumerate() {
            if len != 0 {
                let slot = &mut offsets[len as usize];
                code.symbols[*slot as usize] = symbol as u16;
                *slot += 1;
            }
        }
        Ok((code, left))
    }

    /// Number of codes of length `len`.
    pub fn count(&self, len: usize) -> u16 {
        self.counts.get(len).copied().unwrap_or(0)
    }

    /// Decodes one symbol, reading code bits most significant first.
    ///
    /// With `invert` every input bit is complemented before use.
    pub fn decode(&self, bits: &mut BitReader<'_>, invert: bool) -> DecodeResult<u16> {
        let flip = u32::from(invert);
        let mut code: i32 = 0;
        let mut first: i32 = 0;
        let mut index: i32 = 0;
        for &count in &self.counts[1..] {
            code |= (bits.bits(1)? ^ flip) as i32;
            let count = i32::from(count);
            if code - count < first {
                return Ok(self.symbols[(index + code - first) as usize]);
            }
            index += count;
            first += count;
            first <<= 1;
            code <<= 1;
        }
        Err(DecodeError::corrupt("invalid prefix code"))
    }
}
