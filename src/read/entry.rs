//! Parsed central directory entries.

use std::time::SystemTime;

use crate::format::directory::CentralRecord;
use crate::format::name::{decode_name, sanitize_name};
use crate::format::{ATTRIBUTE_DIRECTORY, flags, host, method};
use crate::timestamp::DosDateTime;

/// An entry of a ZIP archive, as described by its central directory record.
///
/// This struct is marked `#[non_exhaustive]` to allow adding new fields
/// in future versions without breaking downstream code.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct DirectoryEntry {
    /// Sanitized `/`-separated name, without a trailing separator.
    pub name: String,
    /// Name bytes as stored in the archive.
    pub raw_name: Vec<u8>,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Compressed size in bytes, encryption overhead included.
    pub compressed_size: u64,
    /// Compression method number (99 for WinZip AES).
    pub method: u16,
    /// General purpose bit flags.
    pub flags: u16,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Offset of the local header on its volume, prefix bytes included.
    pub local_header_offset: u64,
    /// Zero-based volume holding the local header.
    pub disk_start: u32,
    /// DOS attributes (low 16 bits of the external attributes).
    pub attributes: u16,
    /// Unix permission and type bits, when the producer was a Unix host.
    pub unix_mode: Option<u32>,
    /// Raw DOS modification date and time.
    pub dos_time: DosDateTime,
    /// Host system from the "version made by" field.
    pub host_system: u8,
    /// Whether this entry is a directory.
    pub is_directory: bool,
    /// Position in the central directory.
    pub index: usize,
    /// Extra field block of the central record.
    pub(crate) extra: Vec<u8>,
}

impl DirectoryEntry {
    pub(crate) fn from_record(record: CentralRecord, index: usize) -> Self {
        let header = &record.header;
        let decoded = decode_name(&record.name, header.flags, header.version_made_by);
        let sanitized = sanitize_name(&decoded);
        let host_system = header.host_system();
        let attributes = header.external_attributes as u16;
        let size = record.fields.uncompressed_size;

        let dos_directory = attributes & ATTRIBUTE_DIRECTORY != 0
            && (host::is_fat_family(host_system) || size == 0);
        let unix_mode = (host_system == host::UNIX)
            .then_some(header.external_attributes >> 16)
            .filter(|&mode| mode != 0);

        Self {
            name: sanitized.path,
            raw_name: record.name,
            size,
            compressed_size: record.fields.compressed_size,
            method: header.method,
            flags: header.flags,
            crc32: header.crc32,
            local_header_offset: record.fields.local_header_offset,
            disk_start: record.fields.disk_start,
            attributes,
            unix_mode,
            dos_time: DosDateTime::new(header.dos_date, header.dos_time),
            host_system,
            is_directory: sanitized.trailing_separator || dos_directory,
            index,
            extra: record.extra,
        }
    }

    /// Returns the last path component.
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Returns the directory part of the name, empty at the archive root.
    pub fn parent(&self) -> &str {
        self.name.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// Returns true if this is a file (not a directory).
    pub fn is_file(&self) -> bool {
        !self.is_directory
    }

    /// Returns true if the entry is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.flags & flags::ENCRYPTED != 0 || self.method == method::AES
    }

    /// Returns true if the entry uses WinZip AES encryption.
    pub fn is_aes(&self) -> bool {
        self.method == method::AES
    }

    /// Returns true if the CRC and sizes follow the data in a descriptor.
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & flags::DATA_DESCRIPTOR != 0
    }

    /// Returns the modification time, read as UTC.
    ///
    /// Invalid DOS values give 1980-01-01 00:00:00.
    pub fn modified(&self) -> SystemTime {
        self.dos_time.as_system_time()
    }

    /// Returns true if names from this entry's host compare case-sensitively.
    pub fn is_case_sensitive(&self) -> bool {
        self.host_system == host::UNIX
    }
}

#[cfg(test)]
impl DirectoryEntry {
    /// A stored four-byte entry made by `host`.
    pub(crate) fn sample(name: &str, host: u8, index: usize) -> Self {
        use crate::format::extra::Zip64Fields;
        use crate::format::header::CentralHeader;

        let record = CentralRecord {
            header: CentralHeader {
                version_made_by: (u16::from(host) << 8) | 20,
                version_needed: 20,
                flags: 0x0800,
                method: 0,
                dos_time: 0,
                dos_date: 0,
                crc32: 0,
                compressed_size: 4,
                uncompressed_size: 4,
                name_len: name.len() as u16,
                extra_len: 0,
                comment_len: 0,
                disk_start: 0,
                internal_attributes: 0,
                external_attributes: 0,
                local_header_offset: 0,
            },
            name: name.as_bytes().to_vec(),
            extra: Vec::new(),
            fields: Zip64Fields {
                uncompressed_size: 4,
                compressed_size: 4,
                local_header_offset: 0,
                disk_start: 0,
            },
        };
        DirectoryEntry::from_record(record, index)
    }
}
