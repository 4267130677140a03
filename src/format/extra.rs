//! Extra field parsing: Zip64 sizes and WinZip AES parameters.

use super::extra_id;
use super::reader::FieldReader;

/// Iterates `(header_id, data)` pairs of an extra field block.
///
/// Iteration stops at the first field whose declared length overruns the
/// block; trailing garbage is common in real archives and is ignored.
pub fn fields(extra: &[u8]) -> impl Iterator<Item = (u16, &[u8])> {
    let mut r = FieldReader::new(extra);
    std::iter::from_fn(move || {
        let id = r.u16()?;
        let len = r.u16()? as usize;
        let data = r.take(len)?;
        Some((id, data))
    })
}

/// Returns the data of the first field with `id`.
pub fn find(extra: &[u8], id: u16) -> Option<&[u8]> {
    fields(extra).find(|(field_id, _)| *field_id == id).map(|(_, data)| data)
}

/// Sizes and offsets that may be replaced by the Zip64 extra field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zip64Fields {
    /// Uncompressed size.
    pub uncompressed_size: u64,
    /// Compressed size.
    pub compressed_size: u64,
    /// Local header offset.
    pub local_header_offset: u64,
    /// Starting disk.
    pub disk_start: u32,
}

impl Zip64Fields {
    /// Replaces saturated values with the ones in the Zip64 extra field.
    ///
    /// The extra field only carries the values whose 32-bit (or 16-bit, for
    /// the disk) counterparts are saturated, in a fixed order.
    pub fn resolve(mut self, extra: &[u8]) -> Self {
        let Some(data) = find(extra, extra_id::ZIP64) else {
            return self;
        };
        let mut r = FieldReader::new(data);
        if self.uncompressed_size == u32::MAX as u64 {
            match r.u64() {
                Some(v) => self.uncompressed_size = v,
                None => return self,
            }
        }
        if self.compressed_size == u32::MAX as u64 {
            match r.u64() {
                Some(v) => self.compressed_size = v,
                None => return self,
            }
        }
        if self.local_header_offset == u32::MAX as u64 {
            match r.u64() {
                Some(v) => self.local_header_offset = v,
                None => return self,
            }
        }
        if self.disk_start == u16::MAX as u32 {
            if let Some(v) = r.u32() {
                self.disk_start = v;
            }
        }
        self
    }
}

/// WinZip AES key strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AesStrength {
    /// 128-bit key.
    Aes128,
    /// 192-bit key.
    Aes192,
    /// 256-bit key.
    Aes256,
}

impl AesStrength {
    /// Parses the strength byte (1, 2 or 3).
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(AesStrength::Aes128),
            2 => Some(AesStrength::Aes192),
            3 => Some(AesStrength::Aes256),
            _ => None,
        }
    }

    /// Key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            AesStrength::Aes128 => 16,
            AesStrength::Aes192 => 24,
            AesStrength::Aes256 => 32,
        }
    }

    /// Salt length in bytes.
    pub fn salt_len(self) -> usize {
        self.key_len() / 2
    }
}

/// WinZip AES extra field (`0x9901`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AesExtra {
    /// Vendor version: 1 for AE-1, 2 for AE-2.
    pub version: u16,
    /// Vendor ID, `b"AE"` for WinZip.
    pub vendor: [u8; 2],
    /// Key strength.
    pub strength: AesStrength,
    /// The compression method of the decrypted data.
    pub method: u16,
}

/// Minimum data size of the AES extra field.
pub const AES_EXTRA_DATA_SIZE: usize = 7;

impl AesExtra {
    /// Parses the AES extra field out of a local header's extra block.
    ///
    /// Returns a description of the problem when the field is missing,
    /// shorter than seven bytes or declares an unknown strength.
    pub fn parse(extra: &[u8]) -> Result<Self, String> {
        let data = find(extra, extra_id::AES)
            .ok_or_else(|| "AES extra field not found".to_string())?;
        if data.len() < AES_EXTRA_DATA_SIZE {
            return Err(format!("AES extra field data size {} < 7", data.len()));
        }
        let mut r = FieldReader::new(data);
        let short = || "AES extra field truncated".to_string();
        let version = r.u16().ok_or_else(short)?;
        let vendor_bytes = r.take(2).ok_or_else(short)?;
        let strength_byte = r.u8().ok_or_else(short)?;
        let method = r.u16().ok_or_else(short)?;
        let strength = AesStrength::from_byte(strength_byte)
            .ok_or_else(|| format!("invalid AES strength {}", strength_byte))?;

        let vendor = [vendor_bytes[0], vendor_bytes[1]];
        if &vendor != b"AE" {
            log::warn!(
                "unknown AES vendor {:?}",
                String::from_utf8_lossy(&vendor)
            );
        }
        if version != 1 && version != 2 {
            log::warn!("unknown AES vendor version {}", version);
        }

        Ok(Self {
            version,
            vendor,
            strength,
            method,
        })
    }

    /// AE-2 entries store no usable CRC.
    pub fn skips_crc(&self) -> bool {
        self.version == 2
    }
}
