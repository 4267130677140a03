//! Locating and walking the central directory.

use super::extra::Zip64Fields;
use super::header::{
    CentralHeader, EndOfCentralDirectory, Zip64EndOfCentralDirectory, Zip64Locator,
};
use super::reader::u32_at;
use super::{
    CENTRAL_HEADER_SIZE, END_OF_CENTRAL_DIR_SIZE, ZIP64_END_OF_CENTRAL_DIR_SIZE,
    ZIP64_LOCATOR_SIZE, signature,
};
use crate::volume::SpannedReader;
use crate::{Error, Result};

/// Longest comment the end of central directory record can carry.
const MAX_COMMENT_LEN: u64 = u16::MAX as u64;

/// Where the central directory is and how to read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLocation {
    /// Offset of the end of central directory record on the last disk.
    pub eocd_offset: u64,
    /// Index of the last disk (0 for single-volume archives).
    pub last_disk: u32,
    /// Disk holding the start of the central directory.
    pub cd_start_disk: u32,
    /// Physical offset of the central directory on its start disk.
    pub cd_offset: u64,
    /// Size of the central directory in bytes.
    pub cd_size: u64,
    /// Declared number of entries.
    pub total_entries: u64,
    /// Bytes prepended to the archive, e.g. a self-extractor stub.
    pub extra_bytes: u64,
    /// The archive spans several volumes.
    pub multi_volume: bool,
    /// A Zip64 end of central directory record was used.
    pub zip64: bool,
    /// Archive comment.
    pub comment: Vec<u8>,
}

/// Finds the end of central directory record in `tail`.
///
/// The scan goes backward and accepts the first signature whose comment fits
/// in the remaining bytes.
fn find_eocd(tail: &[u8]) -> Option<usize> {
    if tail.len() < END_OF_CENTRAL_DIR_SIZE {
        return None;
    }
    (0..=tail.len() - END_OF_CENTRAL_DIR_SIZE).rev().find(|&pos| {
        if u32_at(tail, pos) != Some(signature::END_OF_CENTRAL_DIR) {
            return false;
        }
        let comment_len = u16::from_le_bytes([tail[pos + 20], tail[pos + 21]]) as usize;
        pos + END_OF_CENTRAL_DIR_SIZE + comment_len <= tail.len()
    })
}

fn saturated16(v: u16) -> bool {
    v == u16::MAX
}

fn saturated32(v: u32) -> bool {
    v == u32::MAX
}

/// Reads a u32 signature at `(disk, offset)`, `None` on any read failure.
fn signature_at(reader: &mut SpannedReader, disk: u32, offset: u64) -> Option<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact_at(disk, offset, &mut buf).ok()?;
    Some(u32::from_le_bytes(buf))
}

fn read_zip64_record(
    reader: &mut SpannedReader,
    disk: u32,
    offset: u64,
) -> Result<(Zip64EndOfCentralDirectory, u64)> {
    let mut buf = [0u8; ZIP64_END_OF_CENTRAL_DIR_SIZE];
    reader.read_exact_at(disk, offset, &mut buf)?;
    let record = Zip64EndOfCentralDirectory::parse(&buf, offset)?;
    if record.has_v2_fields() {
        let mut v2 = [0u8; Zip64EndOfCentralDirectory::V2_EXTENSION_SIZE];
        reader.read_exact(&mut v2)?;
        Zip64EndOfCentralDirectory::check_v2(&v2, offset + buf.len() as u64)?;
    }
    Ok((record, offset))
}

/// Locates the central directory of the archive `reader` was opened on.
///
/// Resolves Zip64 values, detects spanned archives (switching `reader` into
/// multi-volume mode) and computes the number of bytes prepended to a
/// single-volume archive.
pub fn locate(reader: &mut SpannedReader) -> Result<DirectoryLocation> {
    let (tail_start, tail) =
        reader.read_tail(MAX_COMMENT_LEN + END_OF_CENTRAL_DIR_SIZE as u64)?;
    let pos = find_eocd(&tail).ok_or_else(|| {
        Error::InvalidFormat("end of central directory record not found".to_string())
    })?;
    let eocd_offset = tail_start + pos as u64;
    let eocd = EndOfCentralDirectory::parse(&tail[pos..], eocd_offset)?;
    let comment_start = pos + END_OF_CENTRAL_DIR_SIZE;
    let comment = tail[comment_start..comment_start + eocd.comment_len as usize].to_vec();
    log::debug!("end of central directory at {}", eocd_offset);

    let current_disk = reader.position().0;
    let zip64 = if eocd_offset >= ZIP64_LOCATOR_SIZE as u64 {
        let locator_offset = eocd_offset - ZIP64_LOCATOR_SIZE as u64;
        let mut buf = [0u8; ZIP64_LOCATOR_SIZE];
        reader.read_exact_at(current_disk, locator_offset, &mut buf)?;
        Zip64Locator::parse(&buf).map(|locator| (locator, locator_offset))
    } else {
        None
    };

    let mut disk_number = u32::from(eocd.disk_number);
    let mut cd_start_disk = u32::from(eocd.cd_start_disk);
    let mut total_entries = u64::from(eocd.total_entries);
    let mut cd_size = u64::from(eocd.cd_size);
    let mut cd_offset = u64::from(eocd.cd_offset);
    let mut zip64_offset = None;

    if let Some((locator, locator_offset)) = zip64 {
        // Spanned archives need the disk switch before the record can be read.
        let multi = locator.total_disks > 1;
        if multi {
            reader.set_multi_volume(locator.total_disks - 1);
        }
        let record_disk = if multi {
            locator.record_disk
        } else {
            reader.position().0
        };

        let mut found = None;
        if signature_at(reader, record_disk, locator.record_offset)
            == Some(signature::ZIP64_END_OF_CENTRAL_DIR)
        {
            found = Some(locator.record_offset);
        } else if !multi && locator_offset >= ZIP64_END_OF_CENTRAL_DIR_SIZE as u64 {
            // Prepended bytes shift the record away from its declared offset.
            let adjacent = locator_offset - ZIP64_END_OF_CENTRAL_DIR_SIZE as u64;
            if signature_at(reader, record_disk, adjacent)
                == Some(signature::ZIP64_END_OF_CENTRAL_DIR)
            {
                found = Some(adjacent);
            }
        }
        let record_offset = found.ok_or_else(|| {
            Error::corrupt_header(locator.record_offset, "zip64 end of central directory not found")
        })?;
        let (record, record_offset) = read_zip64_record(reader, record_disk, record_offset)?;
        log::debug!("zip64 end of central directory at {}", record_offset);

        if saturated16(eocd.disk_number) {
            disk_number = record.disk_number;
        }
        if saturated16(eocd.cd_start_disk) {
            cd_start_disk = record.cd_start_disk;
        }
        if saturated16(eocd.total_entries) {
            total_entries = record.total_entries;
        }
        if saturated32(eocd.cd_size) {
            cd_size = record.cd_size;
        }
        if saturated32(eocd.cd_offset) {
            cd_offset = record.cd_offset;
        }
        zip64_offset = Some(record_offset);
    }

    let multi_volume = disk_number > 0 && !(zip64_offset.is_none() && saturated16(eocd.disk_number));
    if multi_volume && !reader.is_multi_volume() {
        reader.set_multi_volume(disk_number);
    }

    let mut extra_bytes = 0;
    if !multi_volume && cd_size > 0 {
        let expected = zip64_offset.unwrap_or(eocd_offset);
        let end = cd_offset.saturating_add(cd_size);
        if expected > end {
            let extra = expected - end;
            if cd_offset == 0 {
                cd_offset = extra;
            } else if signature_at(reader, 0, cd_offset + extra) == Some(signature::CENTRAL_HEADER)
            {
                extra_bytes = extra;
            } else if signature_at(reader, 0, cd_offset) != Some(signature::CENTRAL_HEADER) {
                return Err(Error::corrupt_header(
                    cd_offset,
                    "central directory not found",
                ));
            }
        } else if expected < end && expected > cd_offset {
            cd_size = expected - cd_offset;
        }
        if extra_bytes > 0 {
            log::debug!("{} bytes precede the archive", extra_bytes);
        }
    }

    Ok(DirectoryLocation {
        eocd_offset,
        last_disk: if multi_volume { disk_number } else { 0 },
        cd_start_disk: if multi_volume { cd_start_disk } else { 0 },
        cd_offset: cd_offset + extra_bytes,
        cd_size,
        total_entries,
        extra_bytes,
        multi_volume,
        zip64: zip64_offset.is_some(),
        comment,
    })
}

/// One central directory record with Zip64 values resolved.
#[derive(Debug, Clone)]
pub struct CentralRecord {
    /// Fixed part.
    pub header: CentralHeader,
    /// Raw name bytes.
    pub name: Vec<u8>,
    /// Extra field block.
    pub extra: Vec<u8>,
    /// Resolved sizes, local offset (prefix bytes included) and start disk.
    pub fields: Zip64Fields,
}

/// Reads every record of the central directory.
///
/// A record with a bad signature or a variable part running past the
/// directory is [`Error::CorruptHeader`].
pub fn read_central_directory(
    reader: &mut SpannedReader,
    location: &DirectoryLocation,
) -> Result<Vec<CentralRecord>> {
    let size = usize::try_from(location.cd_size).map_err(|_| Error::OutOfMemory)?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(size).map_err(|_| Error::OutOfMemory)?;
    buf.resize(size, 0);
    reader.read_exact_at(location.cd_start_disk, location.cd_offset, &mut buf)?;

    let mut records = Vec::new();
    let capacity = usize::try_from(location.total_entries)
        .unwrap_or(0)
        .min(size / CENTRAL_HEADER_SIZE);
    records
        .try_reserve(capacity)
        .map_err(|_| Error::OutOfMemory)?;

    let mut pos = 0usize;
    while pos < buf.len() {
        let offset = location.cd_offset + pos as u64;
        let header = CentralHeader::parse(&buf[pos..], offset)?;
        let variable_start = pos + CENTRAL_HEADER_SIZE;
        let record_end = variable_start + header.variable_len();
        if record_end > buf.len() {
            return Err(Error::corrupt_header(
                offset,
                "central record runs past the directory",
            ));
        }
        let name_end = variable_start + header.name_len as usize;
        let extra_end = name_end + header.extra_len as usize;
        let name = buf[variable_start..name_end].to_vec();
        let extra = buf[name_end..extra_end].to_vec();

        let mut fields = Zip64Fields {
            uncompressed_size: u64::from(header.uncompressed_size),
            compressed_size: u64::from(header.compressed_size),
            local_header_offset: u64::from(header.local_header_offset),
            disk_start: u32::from(header.disk_start),
        }
        .resolve(&extra);
        fields.local_header_offset += location.extra_bytes;
        if !location.multi_volume {
            fields.disk_start = 0;
        }

        records.push(CentralRecord {
            header,
            name,
            extra,
            fields,
        });
        pos = record_end;
    }

    if records.len() as u64 != location.total_entries {
        log::warn!(
            "central directory declares {} entries, found {}",
            location.total_entries,
            records.len()
        );
    }
    Ok(records)
}
