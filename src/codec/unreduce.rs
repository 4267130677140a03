//! Reduced entries (methods 2 to 5).
//!
//! Bytes are coded against per-byte follower sets, then run through a
//! DLE-escaped LZ77 expansion whose length/distance split depends on the
//! compression factor.

use super::bits::BitReader;
use super::window::Window;
use super::{DecodeError, DecodeResult, Decoder, Flush, Refill};

const DLE: u8 = 144;
const MAX_FOLLOWERS: usize = 32;

const LENGTH_MASK: [u8; 4] = [0x7f, 0x3f, 0x1f, 0x0f];
const DISTANCE_SHIFT: [u8; 4] = [7, 6, 5, 4];
const DISTANCE_MASK: [u8; 4] = [0x01, 0x03, 0x07, 0x0f];

/// Bits needed to index a follower set of `n` entries.
fn index_bits(n: usize) -> u32 {
    match n {
        0..=2 => 1,
        _ => usize::BITS - (n - 1).leading_zeros(),
    }
}

#[derive(Clone, Copy)]
struct FollowerSet {
    len: usize,
    bytes: [u8; MAX_FOLLOWERS],
}

fn read_follower_sets(bits: &mut BitReader<'_>) -> DecodeResult<Box<[FollowerSet; 256]>> {
    let mut sets = Box::new(
        [FollowerSet {
            len: 0,
            bytes: [0; MAX_FOLLOWERS],
        }; 256],
    );
    for set in sets.iter_mut().rev() {
        let len = bits.bits(6)? as usize;
        if len > MAX_FOLLOWERS {
            return Err(DecodeError::corrupt(format!(
                "follower set of {} bytes",
                len
            )));
        }
        set.len = len;
        for b in &mut set.bytes[..len] {
            *b = bits.byte()?;
        }
    }
    Ok(sets)
}

enum State {
    Literal,
    Escape,
    ExtraLength,
    Distance,
}

/// Decoder for reduced data.
pub struct UnreduceDecoder<'a> {
    input_buf: &'a mut [u8],
    window: &'a mut Window,
    factor: u8,
    size: u64,
}

impl<'a> UnreduceDecoder<'a> {
    /// Creates a decoder for compression `factor` (1 to 4) producing `size`
    /// bytes.
    pub fn new(input_buf: &'a mut [u8], window: &'a mut Window, factor: u8, size: u64) -> Self {
        Self {
            input_buf,
            window,
            factor,
            size,
        }
    }
}

impl Decoder for UnreduceDecoder<'_> {
    fn decode(&mut self, input: &mut dyn Refill, output: &mut dyn Flush) -> DecodeResult<()> {
        if !(1..=4).contains(&self.factor) {
            return Err(DecodeError::corrupt(format!(
                "invalid reduce factor {}",
                self.factor
            )));
        }
        let f = (self.factor - 1) as usize;
        let mut bits = BitReader::new(input, &mut *self.input_buf);
        let sets = read_follower_sets(&mut bits)?;
        let window = &mut *self.window;

        let mut last = 0u8;
        let mut state = State::Literal;
        let mut value = 0u8;
        let mut len = 0usize;

        while window.total() < self.size {
            let set = &sets[last as usize];
            let byte = if set.len == 0 || bits.bits(1)? == 1 {
                bits.byte()?
            } else {
                let index = bits.bits(index_bits(set.len))? as usize;
                if index >= set.len {
                    return Err(DecodeError::corrupt("follower index out of range"));
                }
                set.bytes[index]
            };

            state = match state {
                State::Literal if byte == DLE => State::Escape,
                State::Literal => {
                    window.push(byte, output)?;
                    State::Literal
                }
                State::Escape if byte == 0 => {
                    window.push(DLE, output)?;
                    State::Literal
                }
                State::Escape => {
                    value = byte;
                    len = usize::from(byte & LENGTH_MASK[f]);
                    if len == usize::from(LENGTH_MASK[f]) {
                        State::ExtraLength
                    } else {
                        State::Distance
                    }
                }
                State::ExtraLength => {
                    len += usize::from(byte);
                    State::Distance
                }
                State::Distance => {
                    let high = usize::from((value >> DISTANCE_SHIFT[f]) & DISTANCE_MASK[f]);
                    let distance = (high << 8) + usize::from(byte) + 1;
                    let remaining = self.size - window.total();
                    let count = ((len + 3) as u64).min(remaining) as usize;
                    window.copy(distance, count, true, output)?;
                    State::Literal
                }
            };
            last = byte;
        }
        window.finish(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Method;
    use crate::codec::testing::{BitWriter, run};

    fn empty_sets(w: &mut BitWriter) {
        for _ in 0..256 {
            w.bits(0, 6);
        }
    }

    #[test]
    fn test_index_bits() {
        assert_eq!(index_bits(1), 1);
        assert_eq!(index_bits(2), 1);
        assert_eq!(index_bits(3), 2);
        assert_eq!(index_bits(4), 2);
        assert_eq!(index_bits(5), 3);
        assert_eq!(index_bits(32), 5);
    }

    #[test]
    fn test_literals_and_escaped_dle() {
        let mut w = BitWriter::default();
        empty_sets(&mut w);
        for b in [b'h', b'i', DLE, 0, b'!'] {
            w.bits(u32::from(b), 8);
        }
        let out = run(Method::Reduce(1), 4, &w.finish()).unwrap();
        assert_eq!(out, vec![b'h', b'i', DLE, b'!']);
    }

    #[test]
    fn test_match_factor_one() {
        let mut w = BitWriter::default();
        empty_sets(&mut w);
        for b in b"abc" {
            w.bits(u32::from(*b), 8);
        }
        // length 4 + 3, distance 3
        for b in [DLE, 4, 2] {
            w.bits(u32::from(b), 8);
        }
        let out = run(Method::Reduce(1), 10, &w.finish()).unwrap();
        assert_eq!(out, b"abcabcabca");
    }

    #[test]
    fn test_extra_length_factor_four() {
        let mut w = BitWriter::default();
        empty_sets(&mut w);
        w.bits(u32::from(b'q'), 8);
        // low nibble saturated: 15 + 5 + 3 bytes, distance 1
        for b in [DLE, 0x0f, 5, 0] {
            w.bits(u32::from(b), 8);
        }
        let out = run(Method::Reduce(4), 24, &w.finish()).unwrap();
        assert_eq!(out, vec![b'q'; 24]);
    }

    #[test]
    fn test_follower_set_index() {
        let mut w = BitWriter::default();
        // sets are stored from byte 255 down to byte 0
        for x in (0..=255u8).rev() {
            if x == b'a' {
                w.bits(3, 6);
                for b in [b'x', b'y', b'z'] {
                    w.bits(u32::from(b), 8);
                }
            } else {
                w.bits(0, 6);
            }
        }
        w.bits(u32::from(b'a'), 8);
        // after 'a': index 2 selects 'z'
        w.bits(0, 1);
        w.bits(2, 2);
        let out = run(Method::Reduce(2), 2, &w.finish()).unwrap();
        assert_eq!(out, b"az");
    }

    #[test]
    fn test_oversized_follower_set() {
        let mut w = BitWriter::default();
        w.bits(33, 6);
        let err = run(Method::Reduce(1), 1, &w.finish()).unwrap_err();
        assert!(matches!(err, DecodeError::Corrupt(_)));
    }
}
