//! Shared test utilities for integration tests.
//!
//! [`ZipBuilder`] writes small archives byte by byte so tests can control
//! every header field, including the broken ones.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zunpack::crypto::ZipCryptoKeys;
#[cfg(feature = "aes")]
use zunpack::format::extra::AesStrength;

/// 2020-06-15.
pub const DOS_DATE: u16 = ((2020 - 1980) << 9) | (6 << 5) | 15;
/// 12:30:10.
pub const DOS_TIME: u16 = (12 << 11) | (30 << 5) | 5;

/// How an entry's data is compressed.
#[derive(Debug, Clone)]
pub enum Compression {
    /// Method 0.
    Stored,
    /// Method 8, raw deflate from flate2.
    Deflated,
    /// Method 12.
    #[cfg(feature = "bzip2")]
    Bzip2,
    /// Any method, with the compressed bytes supplied by the test.
    Raw { method: u16, bytes: Vec<u8> },
}

/// How an entry is encrypted.
#[derive(Debug, Clone)]
pub enum Encryption {
    None,
    ZipCrypto(String),
    #[cfg(feature = "aes")]
    Aes {
        password: String,
        strength: AesStrength,
        version: u16,
    },
}

/// One entry of a fixture archive.
#[derive(Debug, Clone)]
pub struct ZipEntry {
    pub name: Vec<u8>,
    pub data: Vec<u8>,
    pub compression: Compression,
    pub encryption: Encryption,
    pub flags: u16,
    pub host: u8,
    pub external_attributes: u32,
    pub data_descriptor: bool,
    pub zip64: bool,
    pub dos_time: u16,
    pub dos_date: u16,
    /// Replaces the local extra field when set.
    pub local_extra: Option<Vec<u8>>,
}

impl ZipEntry {
    /// A stored file with a UTF-8 name.
    pub fn file(name: &str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.as_bytes().to_vec(),
            data: data.into(),
            compression: Compression::Stored,
            encryption: Encryption::None,
            flags: 0x0800,
            host: 0,
            external_attributes: 0x20,
            data_descriptor: false,
            zip64: false,
            dos_time: DOS_TIME,
            dos_date: DOS_DATE,
            local_extra: None,
        }
    }

    /// A directory entry. `name` gets a trailing slash if it lacks one.
    pub fn dir(name: &str) -> Self {
        let name = if name.ends_with('/') {
            name.to_string()
        } else {
            format!("{name}/")
        };
        let mut entry = Self::file(&name, Vec::new());
        entry.external_attributes = 0x10;
        entry
    }

    /// A file whose name is given as raw bytes, without the UTF-8 flag.
    pub fn raw_name(name: &[u8], data: impl Into<Vec<u8>>) -> Self {
        let mut entry = Self::file("", data);
        entry.name = name.to_vec();
        entry.flags = 0;
        entry
    }

    pub fn deflated(mut self) -> Self {
        self.compression = Compression::Deflated;
        self
    }

    #[cfg(feature = "bzip2")]
    pub fn bzip2(mut self) -> Self {
        self.compression = Compression::Bzip2;
        self
    }

    pub fn raw(mut self, method: u16, bytes: impl Into<Vec<u8>>) -> Self {
        self.compression = Compression::Raw {
            method,
            bytes: bytes.into(),
        };
        self
    }

    pub fn flags(mut self, flags: u16) -> Self {
        self.flags |= flags;
        self
    }

    pub fn zipcrypto(mut self, password: &str) -> Self {
        self.encryption = Encryption::ZipCrypto(password.to_string());
        self
    }

    #[cfg(feature = "aes")]
    pub fn aes(mut self, password: &str, strength: AesStrength, version: u16) -> Self {
        self.encryption = Encryption::Aes {
            password: password.to_string(),
            strength,
            version,
        };
        self
    }

    pub fn unix_mode(mut self, mode: u32) -> Self {
        self.host = 3;
        self.external_attributes = mode << 16;
        self
    }

    pub fn data_descriptor(mut self) -> Self {
        self.data_descriptor = true;
        self
    }

    pub fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    pub fn local_extra(mut self, extra: Vec<u8>) -> Self {
        self.local_extra = Some(extra);
        self
    }
}

/// An entry after compression and encryption.
struct Encoded {
    method: u16,
    flags: u16,
    crc: u32,
    payload: Vec<u8>,
    extra: Vec<u8>,
}

fn compress(entry: &ZipEntry) -> (u16, Vec<u8>) {
    match &entry.compression {
        Compression::Stored => (0, entry.data.clone()),
        Compression::Deflated => {
            let mut encoder =
                flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&entry.data).unwrap();
            (8, encoder.finish().unwrap())
        }
        #[cfg(feature = "bzip2")]
        Compression::Bzip2 => {
            let mut encoder =
                bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            encoder.write_all(&entry.data).unwrap();
            (12, encoder.finish().unwrap())
        }
        Compression::Raw { method, bytes } => (*method, bytes.clone()),
    }
}

fn encode(entry: &ZipEntry) -> Encoded {
    let (method, compressed) = compress(entry);
    let crc = crc32fast::hash(&entry.data);
    let mut flags = entry.flags;
    if entry.data_descriptor {
        flags |= 0x0008;
    }

    match &entry.encryption {
        Encryption::None => Encoded {
            method,
            flags,
            crc,
            payload: compressed,
            extra: Vec::new(),
        },
        Encryption::ZipCrypto(password) => {
            flags |= 0x0001;
            let check = if entry.data_descriptor {
                (entry.dos_time >> 8) as u8
            } else {
                (crc >> 24) as u8
            };
            let mut keys = ZipCryptoKeys::new(password.as_bytes());
            let mut payload = zipcrypto_header(check).to_vec();
            payload.extend_from_slice(&compressed);
            keys.encrypt(&mut payload);
            Encoded {
                method,
                flags,
                crc,
                payload,
                extra: Vec::new(),
            }
        }
        #[cfg(feature = "aes")]
        Encryption::Aes {
            password,
            strength,
            version,
        } => {
            use hmac::{Hmac, Mac};
            use zunpack::crypto::aes::{AesCtr, DerivedKeys, MAC_LEN};

            flags |= 0x0001;
            let salt: Vec<u8> = (0..strength.salt_len() as u8).map(|i| i ^ 0xa5).collect();
            let keys = DerivedKeys::derive(password.as_bytes(), &salt, *strength);
            let mut data = compressed;
            AesCtr::with_key(*strength, keys.encryption_key())
                .unwrap()
                .apply(&mut data);
            let mut mac = <Hmac<sha1::Sha1> as Mac>::new_from_slice(keys.mac_key()).unwrap();
            mac.update(&data);
            let tag = mac.finalize().into_bytes();

            let mut payload = salt;
            payload.extend_from_slice(&keys.verifier());
            payload.extend_from_slice(&data);
            payload.extend_from_slice(&tag[..MAC_LEN]);

            let strength_byte = match strength {
                AesStrength::Aes128 => 1u8,
                AesStrength::Aes192 => 2,
                AesStrength::Aes256 => 3,
            };
            let mut field = version.to_le_bytes().to_vec();
            field.extend_from_slice(b"AE");
            field.push(strength_byte);
            field.extend_from_slice(&method.to_le_bytes());

            Encoded {
                method: 99,
                flags,
                crc: if *version == 2 { 0 } else { crc },
                payload,
                extra: extra_field(0x9901, &field),
            }
        }
    }
}

fn zipcrypto_header(check: u8) -> [u8; 12] {
    let mut header = [0u8; 12];
    for (i, b) in header.iter_mut().enumerate() {
        *b = (i as u8).wrapping_mul(37).wrapping_add(11);
    }
    header[11] = check;
    header
}

/// A password that fails the ZipCrypto header check of an entry encrypted
/// with `password`, so tests never hit the one-in-256 false accept.
pub fn rejected_password(password: &str, data: &[u8]) -> String {
    let check = (crc32fast::hash(data) >> 24) as u8;
    let mut header = zipcrypto_header(check);
    ZipCryptoKeys::new(password.as_bytes()).encrypt(&mut header);
    (0..)
        .map(|i| format!("wrong{i}"))
        .find(|candidate| {
            let mut probe = header;
            ZipCryptoKeys::new(candidate.as_bytes()).decrypt(&mut probe);
            probe[11] != check
        })
        .unwrap()
}

/// Encodes one extra field block.
pub fn extra_field(id: u16, data: &[u8]) -> Vec<u8> {
    let mut v = id.to_le_bytes().to_vec();
    v.extend_from_slice(&(data.len() as u16).to_le_bytes());
    v.extend_from_slice(data);
    v
}

fn put16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Writes fixture archives.
#[derive(Debug, Clone, Default)]
pub struct ZipBuilder {
    entries: Vec<ZipEntry>,
    prefix: Vec<u8>,
    comment: Vec<u8>,
}

/// Local records plus the pieces needed to write the central directory.
struct Layout {
    data: Vec<u8>,
    central: Vec<(ZipEntry, Encoded, u64)>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, entry: ZipEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn file(self, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.entry(ZipEntry::file(name, data))
    }

    /// Bytes placed before the archive without adjusting any offset, the
    /// way a self-extractor stub is prepended.
    pub fn prefix(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.prefix = bytes.into();
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = comment.as_bytes().to_vec();
        self
    }

    fn layout(&self) -> Layout {
        let mut data = Vec::new();
        let mut central = Vec::new();
        for entry in &self.entries {
            let encoded = encode(entry);
            let offset = data.len() as u64;
            let size = entry.data.len() as u64;
            let csize = encoded.payload.len() as u64;

            let mut extra = encoded.extra.clone();
            if entry.zip64 {
                let mut z = size.to_le_bytes().to_vec();
                z.extend_from_slice(&csize.to_le_bytes());
                extra.extend(extra_field(0x0001, &z));
            }
            let extra = entry.local_extra.clone().unwrap_or(extra);

            put32(&mut data, 0x0403_4b50);
            put16(&mut data, if entry.zip64 { 45 } else { 20 });
            put16(&mut data, encoded.flags);
            put16(&mut data, encoded.method);
            put16(&mut data, entry.dos_time);
            put16(&mut data, entry.dos_date);
            if entry.data_descriptor {
                put32(&mut data, 0);
                put32(&mut data, 0);
                put32(&mut data, 0);
            } else if entry.zip64 {
                put32(&mut data, encoded.crc);
                put32(&mut data, u32::MAX);
                put32(&mut data, u32::MAX);
            } else {
                put32(&mut data, encoded.crc);
                put32(&mut data, csize as u32);
                put32(&mut data, size as u32);
            }
            put16(&mut data, entry.name.len() as u16);
            put16(&mut data, extra.len() as u16);
            data.extend_from_slice(&entry.name);
            data.extend_from_slice(&extra);
            data.extend_from_slice(&encoded.payload);
            if entry.data_descriptor {
                put32(&mut data, 0x0807_4b50);
                put32(&mut data, encoded.crc);
                put32(&mut data, csize as u32);
                put32(&mut data, size as u32);
            }
            central.push((entry.clone(), encoded, offset));
        }
        Layout { data, central }
    }

    fn central_directory(
        central: &[(ZipEntry, Encoded, u64)],
        position: impl Fn(u64) -> (u32, u64),
    ) -> Vec<u8> {
        let mut cd = Vec::new();
        for (entry, encoded, offset) in central {
            let size = entry.data.len() as u64;
            let csize = encoded.payload.len() as u64;
            let (disk, local) = position(*offset);
            let mut extra = encoded.extra.clone();
            if entry.zip64 {
                let mut z = size.to_le_bytes().to_vec();
                z.extend_from_slice(&csize.to_le_bytes());
                extra.extend(extra_field(0x0001, &z));
            }

            put32(&mut cd, 0x0201_4b50);
            put16(&mut cd, (u16::from(entry.host) << 8) | 20);
            put16(&mut cd, if entry.zip64 { 45 } else { 20 });
            put16(&mut cd, encoded.flags);
            put16(&mut cd, encoded.method);
            put16(&mut cd, entry.dos_time);
            put16(&mut cd, entry.dos_date);
            put32(&mut cd, encoded.crc);
            if entry.zip64 {
                put32(&mut cd, u32::MAX);
                put32(&mut cd, u32::MAX);
            } else {
                put32(&mut cd, csize as u32);
                put32(&mut cd, size as u32);
            }
            put16(&mut cd, entry.name.len() as u16);
            put16(&mut cd, extra.len() as u16);
            put16(&mut cd, 0);
            put16(&mut cd, disk as u16);
            put16(&mut cd, 0);
            put32(&mut cd, entry.external_attributes);
            put32(&mut cd, local as u32);
            cd.extend_from_slice(&entry.name);
            cd.extend_from_slice(&extra);
        }
        cd
    }

    fn end_record(
        &self,
        disk: u16,
        cd_disk: u16,
        entries: u16,
        cd_size: u32,
        cd_offset: u32,
    ) -> Vec<u8> {
        let mut eocd = Vec::new();
        put32(&mut eocd, 0x0605_4b50);
        put16(&mut eocd, disk);
        put16(&mut eocd, cd_disk);
        put16(&mut eocd, entries);
        put16(&mut eocd, entries);
        put32(&mut eocd, cd_size);
        put32(&mut eocd, cd_offset);
        put16(&mut eocd, self.comment.len() as u16);
        eocd.extend_from_slice(&self.comment);
        eocd
    }

    /// Builds a single-volume archive.
    pub fn build(&self) -> Vec<u8> {
        let layout = self.layout();
        let cd = Self::central_directory(&layout.central, |offset| (0, offset));
        let cd_offset = layout.data.len() as u32;

        let mut out = self.prefix.clone();
        out.extend_from_slice(&layout.data);
        out.extend_from_slice(&cd);
        out.extend(self.end_record(
            0,
            0,
            self.entries.len() as u16,
            cd.len() as u32,
            cd_offset,
        ));
        out
    }

    /// Writes the archive to `dir/name` and returns its path.
    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }

    /// Writes a spanned archive: local records split into `stem.z01`,
    /// `stem.z02`, ... of `volume_size` bytes each, and the central
    /// directory alone in `stem.zip`, which is returned.
    pub fn write_split(&self, dir: &Path, stem: &str, volume_size: usize) -> PathBuf {
        let layout = self.layout();
        let chunks: Vec<&[u8]> = layout.data.chunks(volume_size).collect();
        let last_disk = chunks.len() as u32;
        let size = volume_size as u64;
        let cd = Self::central_directory(&layout.central, |offset| {
            ((offset / size) as u32, offset % size)
        });

        for (i, chunk) in chunks.iter().enumerate() {
            std::fs::write(dir.join(format!("{stem}.z{:02}", i + 1)), chunk).unwrap();
        }
        let mut last = cd.clone();
        last.extend(self.end_record(
            last_disk as u16,
            last_disk as u16,
            self.entries.len() as u16,
            cd.len() as u32,
            0,
        ));
        let path = dir.join(format!("{stem}.zip"));
        std::fs::write(&path, last).unwrap();
        path
    }
}

/// Deterministic data mixing text and noise, compressible but not trivially.
pub fn payload(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let words: [&[u8]; 6] = [b"alpha ", b"beta ", b"gamma ", b"delta\n", b"epsilon ", b"zeta "];
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        if rng.gen_bool(0.8) {
            out.extend_from_slice(words[rng.gen_range(0..words.len())]);
        } else {
            out.push(rng.r#gen());
        }
    }
    out.truncate(len);
    out
}

/// Returns the offset of the first occurrence of `needle`.
pub fn find(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("needle not found")
}

/// Offset of an entry's payload: past the local header, name and extra.
pub fn payload_offset(archive: &[u8], local_offset: usize) -> usize {
    let name_len = u16::from_le_bytes([archive[local_offset + 26], archive[local_offset + 27]]);
    let extra_len = u16::from_le_bytes([archive[local_offset + 28], archive[local_offset + 29]]);
    local_offset + 30 + name_len as usize + extra_len as usize
}
