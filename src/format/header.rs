//! Fixed-size ZIP header records.
//!
//! Each `parse` function takes the raw bytes of one record and the archive
//! offset they were read from, which is only used for error messages.

use crate::{Error, Result};

use super::reader::FieldReader;
use super::{
    CENTRAL_HEADER_SIZE, END_OF_CENTRAL_DIR_SIZE, LOCAL_HEADER_SIZE, ZIP64_END_OF_CENTRAL_DIR_SIZE,
    ZIP64_LOCATOR_SIZE, signature,
};

fn short(offset: u64, what: &str) -> Error {
    Error::corrupt_header(offset, format!("truncated {}", what))
}

fn check_signature(r: &mut FieldReader<'_>, expected: u32, offset: u64, what: &str) -> Result<()> {
    let sig = r.u32().ok_or_else(|| short(offset, what))?;
    if sig != expected {
        return Err(Error::corrupt_header(
            offset,
            format!("bad {} signature {:#010x}", what, sig),
        ));
    }
    Ok(())
}

/// Local file header, without name and extra field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHeader {
    /// Version needed to extract.
    pub version_needed: u16,
    /// General purpose bit flags.
    pub flags: u16,
    /// Compression method.
    pub method: u16,
    /// DOS modification time.
    pub dos_time: u16,
    /// DOS modification date.
    pub dos_date: u16,
    /// CRC-32 (zero when a data descriptor is used).
    pub crc32: u32,
    /// Compressed size.
    pub compressed_size: u32,
    /// Uncompressed size.
    pub uncompressed_size: u32,
    /// Length of the name that follows.
    pub name_len: u16,
    /// Length of the extra field that follows the name.
    pub extra_len: u16,
}

impl LocalHeader {
    /// Size of the fixed part.
    pub const SIZE: usize = LOCAL_HEADER_SIZE;

    /// Parses a local header.
    pub fn parse(buf: &[u8], offset: u64) -> Result<Self> {
        let mut r = FieldReader::new(buf);
        check_signature(&mut r, signature::LOCAL_HEADER, offset, "local header")?;
        let e = || short(offset, "local header");
        Ok(Self {
            version_needed: r.u16().ok_or_else(e)?,
            flags: r.u16().ok_or_else(e)?,
            method: r.u16().ok_or_else(e)?,
            dos_time: r.u16().ok_or_else(e)?,
            dos_date: r.u16().ok_or_else(e)?,
            crc32: r.u32().ok_or_else(e)?,
            compressed_size: r.u32().ok_or_else(e)?,
            uncompressed_size: r.u32().ok_or_else(e)?,
            name_len: r.u16().ok_or_else(e)?,
            extra_len: r.u16().ok_or_else(e)?,
        })
    }

    /// Bytes from the start of the header to the first data byte.
    pub fn total_size(&self) -> u64 {
        Self::SIZE as u64 + self.name_len as u64 + self.extra_len as u64
    }
}

/// Central directory file header, without variable-length fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralHeader {
    /// Version made by; the high byte is the host system.
    pub version_made_by: u16,
    /// Version needed to extract.
    pub version_needed: u16,
    /// General purpose bit flags.
    pub flags: u16,
    /// Compression method.
    pub method: u16,
    /// DOS modification time.
    pub dos_time: u16,
    /// DOS modification date.
    pub dos_date: u16,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Compressed size, or `0xFFFFFFFF` when stored in Zip64 extra.
    pub compressed_size: u32,
    /// Uncompressed size, or `0xFFFFFFFF` when stored in Zip64 extra.
    pub uncompressed_size: u32,
    /// Name length.
    pub name_len: u16,
    /// Extra field length.
    pub extra_len: u16,
    /// Comment length.
    pub comment_len: u16,
    /// Disk on which the entry starts, or `0xFFFF` when stored in Zip64 extra.
    pub disk_start: u16,
    /// Internal attributes.
    pub internal_attributes: u16,
    /// External attributes.
    pub external_attributes: u32,
    /// Offset of the local header, or `0xFFFFFFFF` when stored in Zip64 extra.
    pub local_header_offset: u32,
}

impl CentralHeader {
    /// Size of the fixed part.
    pub const SIZE: usize = CENTRAL_HEADER_SIZE;

    /// Parses a central directory header.
    pub fn parse(buf: &[u8], offset: u64) -> Result<Self> {
        let mut r = FieldReader::new(buf);
        check_signature(&mut r, signature::CENTRAL_HEADER, offset, "central header")?;
        let e = || short(offset, "central header");
        Ok(Self {
            version_made_by: r.u16().ok_or_else(e)?,
            version_needed: r.u16().ok_or_else(e)?,
            flags: r.u16().ok_or_else(e)?,
            method: r.u16().ok_or_else(e)?,
            dos_time: r.u16().ok_or_else(e)?,
            dos_date: r.u16().ok_or_else(e)?,
            crc32: r.u32().ok_or_else(e)?,
            compressed_size: r.u32().ok_or_else(e)?,
            uncompressed_size: r.u32().ok_or_else(e)?,
            name_len: r.u16().ok_or_else(e)?,
            extra_len: r.u16().ok_or_else(e)?,
            comment_len: r.u16().ok_or_else(e)?,
            disk_start: r.u16().ok_or_else(e)?,
            internal_attributes: r.u16().ok_or_else(e)?,
            external_attributes: r.u32().ok_or_else(e)?,
            local_header_offset: r.u32().ok_or_else(e)?,
        })
    }

    /// Host system that produced the entry.
    pub fn host_system(&self) -> u8 {
        (self.version_made_by >> 8) as u8
    }

    /// Length of name, extra field and comment together.
    pub fn variable_len(&self) -> usize {
        self.name_len as usize + self.extra_len as usize + self.comment_len as usize
    }
}

/// End of central directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    /// Number of this disk.
    pub disk_number: u16,
    /// Disk where the central directory starts.
    pub cd_start_disk: u16,
    /// Entries on this disk.
    pub entries_on_disk: u16,
    /// Total entries.
    pub total_entries: u16,
    /// Size of the central directory.
    pub cd_size: u32,
    /// Offset of the central directory on its start disk.
    pub cd_offset: u32,
    /// Comment length.
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    /// Size of the fixed part.
    pub const SIZE: usize = END_OF_CENTRAL_DIR_SIZE;

    /// Parses the record.
    pub fn parse(buf: &[u8], offset: u64) -> Result<Self> {
        let mut r = FieldReader::new(buf);
        check_signature(&mut r, signature::END_OF_CENTRAL_DIR, offset, "end of central directory")?;
        let e = || short(offset, "end of central directory");
        Ok(Self {
            disk_number: r.u16().ok_or_else(e)?,
            cd_start_disk: r.u16().ok_or_else(e)?,
            entries_on_disk: r.u16().ok_or_else(e)?,
            total_entries: r.u16().ok_or_else(e)?,
            cd_size: r.u32().ok_or_else(e)?,
            cd_offset: r.u32().ok_or_else(e)?,
            comment_len: r.u16().ok_or_else(e)?,
        })
    }
}

/// Zip64 end of central directory locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zip64Locator {
    /// Disk holding the Zip64 record.
    pub record_disk: u32,
    /// Offset of the Zip64 record on that disk.
    pub record_offset: u64,
    /// Total number of disks.
    pub total_disks: u32,
}

impl Zip64Locator {
    /// Size of the record.
    pub const SIZE: usize = ZIP64_LOCATOR_SIZE;

    /// Parses the locator, returning `None` if the signature does not match.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        let mut r = FieldReader::new(buf);
        if r.u32()? != signature::ZIP64_LOCATOR {
            return None;
        }
        Some(Self {
            record_disk: r.u32()?,
            record_offset: r.u64()?,
            total_disks: r.u32()?,
        })
    }
}

/// Zip64 end of central directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zip64EndOfCentralDirectory {
    /// Size of the remaining record, excluding signature and this field.
    pub record_size: u64,
    /// Version made by.
    pub version_made_by: u16,
    /// Version needed to extract.
    pub version_needed: u16,
    /// Number of this disk.
    pub disk_number: u32,
    /// Disk where the central directory starts.
    pub cd_start_disk: u32,
    /// Entries on this disk.
    pub entries_on_disk: u64,
    /// Total entries.
    pub total_entries: u64,
    /// Size of the central directory.
    pub cd_size: u64,
    /// Offset of the central directory.
    pub cd_offset: u64,
}

impl Zip64EndOfCentralDirectory {
    /// Size of the fixed part.
    pub const SIZE: usize = ZIP64_END_OF_CENTRAL_DIR_SIZE;

    /// Bytes the version 2 fields (method, sizes, algorithm) add to the record.
    pub const V2_EXTENSION_SIZE: usize = 2 + 8 + 8 + 2;

    /// Parses the record.
    pub fn parse(buf: &[u8], offset: u64) -> Result<Self> {
        let mut r = FieldReader::new(buf);
        check_signature(
            &mut r,
            signature::ZIP64_END_OF_CENTRAL_DIR,
            offset,
            "zip64 end of central directory",
        )?;
        let e = || short(offset, "zip64 end of central directory");
        Ok(Self {
            record_size: r.u64().ok_or_else(e)?,
            version_made_by: r.u16().ok_or_else(e)?,
            version_needed: r.u16().ok_or_else(e)?,
            disk_number: r.u32().ok_or_else(e)?,
            cd_start_disk: r.u32().ok_or_else(e)?,
            entries_on_disk: r.u64().ok_or_else(e)?,
            total_entries: r.u64().ok_or_else(e)?,
            cd_size: r.u64().ok_or_else(e)?,
            cd_offset: r.u64().ok_or_else(e)?,
        })
    }

    /// Returns `true` if the record is long enough to carry version 2 fields.
    pub fn has_v2_fields(&self) -> bool {
        self.record_size >= (Self::SIZE - 12 + Self::V2_EXTENSION_SIZE) as u64
    }

    /// Checks the version 2 fields that follow the fixed part.
    ///
    /// A central directory that is itself compressed or encrypted cannot be
    /// read by this crate.
    pub fn check_v2(buf: &[u8], offset: u64) -> Result<()> {
        let mut r = FieldReader::new(buf);
        let e = || short(offset, "zip64 end of central directory");
        let method = r.u16().ok_or_else(e)?;
        r.skip(16).ok_or_else(e)?;
        let algorithm = r.u16().ok_or_else(e)?;
        if method != 0 || algorithm != 0 {
            return Err(Error::UnsupportedFeature {
                feature: "encrypted or compressed central directory",
            });
        }
        Ok(())
    }
}
