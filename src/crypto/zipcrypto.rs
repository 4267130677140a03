//! Traditional PKWARE stream cipher.

use crate::checksum::crc32_update_byte;

/// Size of the encryption header preceding the data.
pub const HEADER_SIZE: usize = 12;

/// The three 32-bit keys of the traditional cipher.
#[derive(Clone)]
pub struct ZipCryptoKeys {
    key0: u32,
    key1: u32,
    key2: u32,
}

impl std::fmt::Debug for ZipCryptoKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ZipCryptoKeys")
    }
}

impl ZipCryptoKeys {
    /// Initializes the keys from a password.
    pub fn new(password: &[u8]) -> Self {
        let mut keys = Self {
            key0: 0x1234_5678,
            key1: 0x2345_6789,
            key2: 0x3456_7890,
        };
        for &b in password {
            keys.update(b);
        }
        keys
    }

    fn update(&mut self, plain: u8) {
        self.key0 = crc32_update_byte(self.key0, plain);
        self.key1 = self
            .key1
            .wrapping_add(self.key0 & 0xFF)
            .wrapping_mul(134_775_813)
            .wrapping_add(1);
        self.key2 = crc32_update_byte(self.key2, (self.key1 >> 24) as u8);
    }

    fn stream_byte(&self) -> u8 {
        let t = (self.key2 | 2) as u16;
        (t.wrapping_mul(t ^ 1) >> 8) as u8
    }

    /// Decrypts `buf` in place.
    pub fn decrypt(&mut self, buf: &mut [u8]) {
        for b in buf {
            let plain = *b ^ self.stream_byte();
            self.update(plain);
            *b = plain;
        }
    }

    /// Encrypts `buf` in place.
    pub fn encrypt(&mut self, buf: &mut [u8]) {
        for b in buf {
            let plain = *b;
            *b = plain ^ self.stream_byte();
            self.update(plain);
        }
    }

    /// Decrypts the encryption header and compares its last byte.
    ///
    /// `check` is the high byte of the CRC, or of the DOS time when the
    /// entry uses a data descriptor.
    pub fn check_header(&mut self, header: &mut [u8; HEADER_SIZE], check: u8) -> bool {
        self.decrypt(header);
        header[HEADER_SIZE - 1] == check
    }
}

/// Check byte the encryption header must end with.
pub fn check_byte(flags: u16, crc32: u32, dos_time: u16) -> u8 {
    if flags & crate::format::flags::DATA_DESCRIPTOR != 0 {
        (dos_time >> 8) as u8
    } else {
        (crc32 >> 24) as u8
    }
}
