//! WinZip AES (AE-1 / AE-2) decryption.
//!
//! Keys come from PBKDF2-HMAC-SHA1 with 1000 iterations over the password
//! and the per-entry salt. The derived bytes are split into the AES key, the
//! HMAC key and a two-byte password verifier. Data is AES in CTR mode with a
//! little-endian counter starting at 1, authenticated by HMAC-SHA1 over the
//! ciphertext truncated to ten bytes.

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::{Aes128, Aes192, Aes256};
use ctr::Ctr128LE;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use zeroize::Zeroizing;

use crate::format::extra::AesStrength;

/// PBKDF2 iteration count fixed by the format.
pub const PBKDF2_ITERATIONS: u32 = 1000;

/// Length of the password verifier.
pub const VERIFIER_LEN: usize = 2;

/// Length of the stored authentication code.
pub const MAC_LEN: usize = 10;

/// Initial counter block: the first keystream block encrypts counter 1.
const INITIAL_COUNTER: [u8; 16] = 1u128.to_le_bytes();

/// AES-CTR keystream as used by WinZip.
pub enum AesCtr {
    /// 128-bit key.
    Aes128(Ctr128LE<Aes128>),
    /// 192-bit key.
    Aes192(Ctr128LE<Aes192>),
    /// 256-bit key.
    Aes256(Ctr128LE<Aes256>),
}

impl AesCtr {
    /// Creates a keystream for `key`, which must have the length of
    /// `strength`.
    ///
    /// CTR mode is symmetric: applying the same keystream encrypts.
    pub fn with_key(strength: AesStrength, key: &[u8]) -> Option<Self> {
        let iv = &INITIAL_COUNTER[..];
        Some(match strength {
            AesStrength::Aes128 => AesCtr::Aes128(Ctr128LE::new_from_slices(key, iv).ok()?),
            AesStrength::Aes192 => AesCtr::Aes192(Ctr128LE::new_from_slices(key, iv).ok()?),
            AesStrength::Aes256 => AesCtr::Aes256(Ctr128LE::new_from_slices(key, iv).ok()?),
        })
    }

    /// XORs the keystream into `buf`.
    pub fn apply(&mut self, buf: &mut [u8]) {
        match self {
            AesCtr::Aes128(c) => c.apply_keystream(buf),
            AesCtr::Aes192(c) => c.apply_keystream(buf),
            AesCtr::Aes256(c) => c.apply_keystream(buf),
        }
    }
}

/// Keys derived from a password and salt.
pub struct DerivedKeys {
    material: Zeroizing<Vec<u8>>,
    key_len: usize,
}

impl DerivedKeys {
    /// Runs PBKDF2 for `strength`.
    pub fn derive(password: &[u8], salt: &[u8], strength: AesStrength) -> Self {
        let key_len = strength.key_len();
        let mut material = Zeroizing::new(vec![0u8; 2 * key_len + VERIFIER_LEN]);
        pbkdf2::pbkdf2_hmac::<Sha1>(password, salt, PBKDF2_ITERATIONS, &mut material);
        Self { material, key_len }
    }

    /// AES key.
    pub fn encryption_key(&self) -> &[u8] {
        &self.material[..self.key_len]
    }

    /// HMAC key.
    pub fn mac_key(&self) -> &[u8] {
        &self.material[self.key_len..2 * self.key_len]
    }

    /// Password verifier.
    pub fn verifier(&self) -> [u8; VERIFIER_LEN] {
        let v = &self.material[2 * self.key_len..];
        [v[0], v[1]]
    }
}

/// Decrypts one AES entry and accumulates its authentication code.
pub struct AesDecryptor {
    ctr: AesCtr,
    mac: Hmac<Sha1>,
}

impl std::fmt::Debug for AesDecryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AesDecryptor")
    }
}

impl AesDecryptor {
    /// Derives keys and checks the stored verifier.
    ///
    /// Returns `None` when the verifier does not match, which means the
    /// password is wrong.
    pub fn new(
        password: &[u8],
        salt: &[u8],
        verifier: [u8; VERIFIER_LEN],
        strength: AesStrength,
    ) -> Option<Self> {
        let keys = DerivedKeys::derive(password, salt, strength);
        if keys.verifier() != verifier {
            return None;
        }
        let ctr = AesCtr::with_key(strength, keys.encryption_key())?;
        let mac = <Hmac<Sha1> as Mac>::new_from_slice(keys.mac_key()).ok()?;
        Some(Self { ctr, mac })
    }

    /// Authenticates and decrypts `buf` in place.
    pub fn decrypt(&mut self, buf: &mut [u8]) {
        self.mac.update(buf);
        self.ctr.apply(buf);
    }

    /// Compares the computed code with the ten bytes stored after the data.
    pub fn verify(self, stored: &[u8]) -> bool {
        self.mac.verify_truncated_left(stored).is_ok()
    }
}
