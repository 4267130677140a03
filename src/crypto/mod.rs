//! Entry decryption.
//!
//! Two schemes are supported:
//! - the traditional PKWARE stream cipher ([`ZipCryptoKeys`]), flagged by
//!   bit 0 of the general purpose flags;
//! - WinZip AES (method 99), available with the `aes` feature.
//!
//! Accepted passwords are kept in a [`PasswordCache`] for the duration of an
//! extraction so that entries sharing a password prompt only once.

#[cfg(feature = "aes")]
pub mod aes;
mod password;
pub mod zipcrypto;

pub use password::{Password, PasswordCache};
pub use zipcrypto::ZipCryptoKeys;

/// Cipher state of one encrypted entry.
#[derive(Debug)]
pub enum EntryCipher {
    /// Traditional stream cipher.
    ZipCrypto(ZipCryptoKeys),
    /// WinZip AES.
    #[cfg(feature = "aes")]
    Aes(Box<aes::AesDecryptor>),
}

impl EntryCipher {
    /// Decrypts `buf` in place.
    pub fn decrypt(&mut self, buf: &mut [u8]) {
        match self {
            EntryCipher::ZipCrypto(keys) => keys.decrypt(buf),
            #[cfg(feature = "aes")]
            EntryCipher::Aes(dec) => dec.decrypt(buf),
        }
    }
}
