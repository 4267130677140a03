//! Imploded entries (method 6).
//!
//! The stream starts with byte-aligned Shannon-Fano tree descriptions: the
//! literal tree (only with flag bit 2), then the length and distance trees.
//! Tree codes are the complement of the canonical code for the same
//! lengths.

use super::bits::BitReader;
use super::huffman::Huffman;
use super::window::Window;
use super::{DecodeError, DecodeResult, Decoder, Flush, Refill};

const LITERAL_SYMBOLS: usize = 256;
const LENGTH_SYMBOLS: usize = 64;
const DISTANCE_SYMBOLS: usize = 64;
const LONG_LENGTH_CODE: usize = 63;

/// Reads one tree description.
///
/// The first byte is the number of entries minus one. Each entry holds the
/// code length minus one in its low nibble and the repeat count minus one in
/// its high nibble.
fn read_tree(bits: &mut BitReader<'_>, symbols: usize) -> DecodeResult<Huffman> {
    let entries = bits.byte()? as usize + 1;
    let mut lengths = vec![0u8; symbols];
    let mut filled = 0;
    for _ in 0..entries {
        let b = bits.byte()?;
        let len = (b & 0x0F) + 1;
        let count = (b >> 4) as usize + 1;
        if filled + count > symbols {
            return Err(DecodeError::corrupt("implode tree describes too many codes"));
        }
        lengths[filled..filled + count].fill(len);
        filled += count;
    }
    if filled != symbols {
        return Err(DecodeError::corrupt("implode tree describes too few codes"));
    }
    let (code, left) = Huffman::new(&lengths)?;
    if left != 0 {
        return Err(DecodeError::corrupt("implode tree is not complete"));
    }
    Ok(code)
}

/// Decoder for imploded data.
pub struct ExplodeDecoder<'a> {
    input_buf: &'a mut [u8],
    window: &'a mut Window,
    large_dictionary: bool,
    literal_tree: bool,
    size: u64,
}

impl<'a> ExplodeDecoder<'a> {
    /// Creates a decoder producing `size` bytes.
    pub fn new(
        input_buf: &'a mut [u8],
        window: &'a mut Window,
        large_dictionary: bool,
        literal_tree: bool,
        size: u64,
    ) -> Self {
        Self {
            input_buf,
            window,
            large_dictionary,
            literal_tree,
            size,
        }
    }
}

impl Decoder for ExplodeDecoder<'_> {
    fn decode(&mut self, input: &mut dyn Refill, output: &mut dyn Flush) -> DecodeResult<()> {
        let mut bits = BitReader::new(input, &mut *self.input_buf);
        let literals = if self.literal_tree {
            Some(read_tree(&mut bits, LITERAL_SYMBOLS)?)
        } else {
            None
        };
        let lengths = read_tree(&mut bits, LENGTH_SYMBOLS)?;
        let distances = read_tree(&mut bits, DISTANCE_SYMBOLS)?;

        let low_distance_bits = if self.large_dictionary { 7 } else { 6 };
        let min_match = if self.literal_tree { 3 } else { 2 };
        let window = &mut *self.window;

        while window.total() < self.size {
            if bits.bits(1)? == 1 {
                let byte = match &literals {
                    Some(tree) => tree.decode(&mut bits, true)? as u8,
                    None => bits.bits(8)? as u8,
                };
                window.push(byte, output)?;
                continue;
            }

            let low = bits.bits(low_distance_bits)? as usize;
            let high = distances.decode(&mut bits, true)? as usize;
            let distance = (high << low_distance_bits | low) + 1;

            let mut len = lengths.decode(&mut bits, true)? as usize;
            if len == LONG_LENGTH_CODE {
                len += bits.bits(8)? as usize;
            }
            len += min_match;

            let remaining = self.size - window.total();
            let len = (len as u64).min(remaining) as usize;
            window.copy(distance, len, true, output)?;
        }
        window.finish(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Method;
    use crate::codec::testing::{BitWriter, run};

    enum Token {
        Literal(u8),
        Match { distance: usize, len: usize },
    }

    /// Writes a tree of `symbols` codes, all `bits` long.
    fn uniform_tree(w: &mut BitWriter, symbols: usize, bits: u8) {
        let entries = symbols / 16;
        w.bits(entries as u32 - 1, 8);
        for _ in 0..entries {
            w.bits(u32::from(0xF0 | (bits - 1)), 8);
        }
    }

    /// Encodes tokens with uniform trees: symbol `s` has canonical code `s`.
    fn implode(tokens: &[Token], large_dictionary: bool, literal_tree: bool) -> Vec<u8> {
        let mut w = BitWriter::default();
        if literal_tree {
            uniform_tree(&mut w, 256, 8);
        }
        uniform_tree(&mut w, 64, 6);
        uniform_tree(&mut w, 64, 6);
        let low_bits = if large_dictionary { 7 } else { 6 };
        let min_match = if literal_tree { 3 } else { 2 };
        for token in tokens {
            match *token {
                Token::Literal(b) => {
                    w.bits(1, 1);
                    if literal_tree {
                        w.bits_msb_first(!u32::from(b) & 0xFF, 8);
                    } else {
                        w.bits(u32::from(b), 8);
                    }
                }
                Token::Match { distance, len } => {
                    w.bits(0, 1);
                    let d = (distance - 1) as u32;
                    w.bits(d & ((1 << low_bits) - 1), low_bits);
                    w.bits_msb_first(!(d >> low_bits) & 63, 6);
                    let code = (len - min_match) as u32;
                    if code >= 63 {
                        w.bits_msb_first(!63 & 63, 6);
                        w.bits(code - 63, 8);
                    } else {
                        w.bits_msb_first(!code & 63, 6);
                    }
                }
            }
        }
        w.finish()
    }

    fn expand(tokens: &[Token]) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        for token in tokens {
            match *token {
                Token::Literal(b) => out.push(b),
                Token::Match { distance, len } => {
                    for _ in 0..len {
                        let b = if distance > out.len() {
                            0
                        } else {
                            out[out.len() - distance]
                        };
                        out.push(b);
                    }
                }
            }
        }
        out
    }

    fn check(tokens: &[Token], large_dictionary: bool, literal_tree: bool) {
        let data = implode(tokens, large_dictionary, literal_tree);
        let expected = expand(tokens);
        let method = Method::Implode {
            large_dictionary,
            literal_tree,
        };
        let out = run(method, expected.len() as u64, &data).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_small_dictionary_raw_literals() {
        let tokens = [
            Token::Literal(b'a'),
            Token::Literal(b'b'),
            Token::Literal(b'c'),
            Token::Match { distance: 3, len: 9 },
            Token::Literal(b'!'),
            Token::Match { distance: 4, len: 2 },
        ];
        check(&tokens, false, false);
    }

    #[test]
    fn test_large_dictionary_literal_tree_long_match() {
        let mut tokens: Vec<Token> = (0..200u32).map(|i| Token::Literal((i * 31) as u8)).collect();
        tokens.push(Token::Match {
            distance: 150,
            len: 3 + 63 + 200,
        });
        tokens.push(Token::Match {
            distance: 7000,
            len: 5,
        });
        check(&tokens, true, true);
    }

    #[test]
    fn test_reference_before_start_yields_zeros() {
        let tokens = [Token::Literal(b'x'), Token::Match { distance: 10, len: 12 }];
        let out = expand(&tokens);
        assert_eq!(&out[..10], &[b'x', 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        check(&tokens, false, false);
    }

    #[test]
    fn test_stops_at_size() {
        let tokens = [Token::Literal(b'a'), Token::Match { distance: 1, len: 50 }];
        let data = implode(&tokens, false, false);
        let out = run(
            Method::Implode {
                large_dictionary: false,
                literal_tree: false,
            },
            20,
            &data,
        )
        .unwrap();
        assert_eq!(out, vec![b'a'; 20]);
    }

    #[test]
    fn test_bad_tree() {
        // one entry covering only 16 of 64 length codes
        let data = [0x00, 0xF5];
        let err = run(
            Method::Implode {
                large_dictionary: false,
                literal_tree: false,
            },
            10,
            &data,
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::Corrupt(_)));
    }
}
