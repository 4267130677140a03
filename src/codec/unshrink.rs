//! Shrunk entries (method 1): LZW with 9 to 13 bit codes and partial
//! clearing.

use super::bits::BitReader;
use super::{DecodeError, DecodeResult, Decoder, Flush, Refill};

const MIN_CODE_BITS: u32 = 9;
const MAX_CODE_BITS: u32 = 13;
const TABLE_SIZE: usize = 1 << MAX_CODE_BITS;
const CONTROL_CODE: u32 = 256;
const FIRST_FREE: usize = 257;

const CONTROL_GROW: u32 = 1;
const CONTROL_PARTIAL_CLEAR: u32 = 2;

/// Marks a table slot with no string.
const FREE: u16 = u16::MAX;
/// Prefix of the single-byte strings.
const ROOT: u16 = u16::MAX - 1;

fn try_table<T: Clone>(value: T) -> DecodeResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(TABLE_SIZE)
        .map_err(|_| DecodeError::OutOfMemory)?;
    v.resize(TABLE_SIZE, value);
    Ok(v)
}

/// LZW string table. Each code is its prefix code plus one suffix byte.
struct StringTable {
    prefix: Vec<u16>,
    suffix: Vec<u8>,
    is_prefix: Vec<bool>,
    stack: Vec<u8>,
    next_free: usize,
}

impl StringTable {
    fn new() -> DecodeResult<Self> {
        let mut stack = Vec::new();
        stack
            .try_reserve_exact(TABLE_SIZE)
            .map_err(|_| DecodeError::OutOfMemory)?;
        Ok(Self {
            prefix: try_table(FREE)?,
            suffix: try_table(0u8)?,
            is_prefix: try_table(false)?,
            stack,
            next_free: FIRST_FREE,
        })
    }

    fn reset(&mut self) {
        self.prefix.fill(FREE);
        for code in 0..256 {
            self.prefix[code] = ROOT;
            self.suffix[code] = code as u8;
        }
        self.prefix[CONTROL_CODE as usize] = ROOT;
        self.next_free = FIRST_FREE;
    }

    fn is_free(&self, code: usize) -> bool {
        self.prefix[code] == FREE
    }

    fn advance_free(&mut self) {
        while self.next_free < TABLE_SIZE && self.prefix[self.next_free] != FREE {
            self.next_free += 1;
        }
    }

    fn add(&mut self, prefix: usize, suffix: u8) {
        if self.next_free < TABLE_SIZE {
            self.prefix[self.next_free] = prefix as u16;
            self.suffix[self.next_free] = suffix;
            self.advance_free();
        }
    }

    /// Frees every code that is not a prefix of another code.
    fn partial_clear(&mut self) {
        self.is_prefix.fill(false);
        for code in FIRST_FREE..TABLE_SIZE {
            let parent = self.prefix[code];
            if parent != FREE && parent != ROOT && parent as usize >= FIRST_FREE {
                self.is_prefix[parent as usize] = true;
            }
        }
        for code in FIRST_FREE..TABLE_SIZE {
            if !self.is_prefix[code] {
                self.prefix[code] = FREE;
            }
        }
        self.next_free = FIRST_FREE;
        self.advance_free();
    }

    /// Loads the string for `code` onto the stack, last byte first.
    fn expand(&mut self, code: usize) -> DecodeResult<()> {
        self.stack.clear();
        let mut c = code;
        loop {
            if self.stack.len() >= TABLE_SIZE {
                return Err(DecodeError::corrupt("shrink string chain loops"));
            }
            self.stack.push(self.suffix[c]);
            match self.prefix[c] {
                ROOT => return Ok(()),
                FREE => return Err(DecodeError::corrupt(format!("code {} is unused", c))),
                parent => c = parent as usize,
            }
        }
    }

    /// First byte of the string for `code`.
    fn first_byte(&mut self, code: usize) -> DecodeResult<u8> {
        self.expand(code)?;
        Ok(self.stack.last().copied().unwrap_or(0))
    }
}

/// Output staging buffer, flushed when full.
struct Staging<'s> {
    buf: &'s mut [u8],
    len: usize,
}

impl Staging<'_> {
    fn push(&mut self, byte: u8, out: &mut dyn Flush) -> DecodeResult<()> {
        self.buf[self.len] = byte;
        self.len += 1;
        if self.len == self.buf.len() {
            out.flush(self.buf)?;
            self.len = 0;
        }
        Ok(())
    }

    fn finish(&mut self, out: &mut dyn Flush) -> DecodeResult<()> {
        if self.len > 0 {
            out.flush(&self.buf[..self.len])?;
            self.len = 0;
        }
        Ok(())
    }
}

/// Decoder for shrunk data.
pub struct UnshrinkDecoder<'a> {
    input_buf: &'a mut [u8],
    staging: &'a mut [u8],
    size: u64,
    table: StringTable,
}

impl<'a> UnshrinkDecoder<'a> {
    /// Creates a decoder producing `size` bytes, allocating the string
    /// table.
    pub fn new(input_buf: &'a mut [u8], staging: &'a mut [u8], size: u64) -> DecodeResult<Self> {
        Ok(Self {
            input_buf,
            staging,
            size,
            table: StringTable::new()?,
        })
    }
}

impl Decoder for UnshrinkDecoder<'_> {
    fn decode(&mut self, input: &mut dyn Refill, output: &mut dyn Flush) -> DecodeResult<()> {
        let table = &mut self.table;
        table.reset();
        let mut bits = BitReader::new(input, &mut *self.input_buf);
        let mut staging = Staging {
            buf: &mut *self.staging,
            len: 0,
        };
        let mut code_bits = MIN_CODE_BITS;
        let mut produced = 0u64;
        let mut prev: Option<usize> = None;

        while produced < self.size {
            let Some(code) = bits.try_bits(code_bits)? else {
                break;
            };
            if code == CONTROL_CODE {
                let Some(control) = bits.try_bits(code_bits)? else {
                    break;
                };
                match control {
                    CONTROL_GROW => {
                        code_bits += 1;
                        if code_bits > MAX_CODE_BITS {
                            return Err(DecodeError::corrupt("shrink code size above 13 bits"));
                        }
                    }
                    CONTROL_PARTIAL_CLEAR => table.partial_clear(),
                    other => {
                        return Err(DecodeError::corrupt(format!(
                            "unknown shrink control code {}",
                            other
                        )));
                    }
                }
                continue;
            }

            let code = code as usize;
            match prev {
                None => {
                    if code > 255 {
                        return Err(DecodeError::corrupt(
                            "shrink stream starts with a string code",
                        ));
                    }
                    table.expand(code)?;
                }
                Some(p) if table.is_free(code) => {
                    // the code being defined by this very step
                    if code != table.next_free {
                        return Err(DecodeError::corrupt(format!("code {} is unused", code)));
                    }
                    let first = table.first_byte(p)?;
                    table.add(p, first);
                    table.expand(code)?;
                }
                Some(p) => {
                    table.expand(code)?;
                    let first = table.stack.last().copied().unwrap_or(0);
                    table.add(p, first);
                }
            }

            for &b in table.stack.iter().rev() {
                if produced == self.size {
                    break;
                }
                staging.push(b, output)?;
                produced += 1;
            }
            prev = Some(code);
        }
        staging.finish(output)
    }
}
