//! Per-entry extraction: local header, decryption, decoding and output.

use std::io::{self, Write};
use std::path::Path;

use crate::checksum::{Checksum, Crc32};
use crate::codec::{DecodeBuffers, DecodeError, DecodeResult, Flush, Method, Refill, decode_entry};
#[cfg(feature = "aes")]
use crate::crypto::aes::AesDecryptor;
use crate::crypto::{EntryCipher, Password, ZipCryptoKeys, zipcrypto};
use crate::error::ErrorCategory;
use crate::format::extra::AesExtra;
use crate::format::header::LocalHeader;
use crate::format::{
    AES_MAC_SIZE, AES_VERIFIER_SIZE, ZIPCRYPTO_HEADER_SIZE, flags, method as method_id,
};
use crate::progress::ProgressReporter;
use crate::volume::SpannedReader;
use crate::{Error, MAX_HEADER_SIZE, Result, TEST_MODE_MAX_PATH};

use super::metadata::apply_metadata;
use super::path_safety::resolve_target;
use super::session::Unlocked;
use super::{DirectoryEntry, EntryOutcome, ExtractRequest, ExtractSession, OverwritePolicy};

impl ExtractSession {
    /// Extracts or tests one entry.
    ///
    /// Recoverable failures are resolved through the error policy and come
    /// back as an [`EntryOutcome`]; `Err` means the archive itself is
    /// unreadable and the run must stop.
    pub(crate) fn extract_entry(
        &mut self,
        reader: &mut SpannedReader,
        entry: &DirectoryEntry,
        request: &ExtractRequest,
    ) -> Result<EntryOutcome> {
        let name = entry.name.as_str();
        let relative = request.relative_name(entry);
        let limit = if request.test_only {
            TEST_MODE_MAX_PATH
        } else {
            self.max_path_len
        };
        let target = match resolve_target(&request.target_dir, &relative, entry.is_directory, limit)
        {
            Ok(path) => path,
            Err(e) => return self.give_up(name, e),
        };

        let (local, local_extra) = match read_local_header(reader, entry) {
            Ok(found) => found,
            Err(e) => return self.give_up(name, e),
        };

        if entry.is_directory {
            if !request.test_only {
                if let Err(outcome) = self.with_retry(name, |fs| fs.create_dir_all(&target))? {
                    return Ok(outcome);
                }
                apply_metadata(self.fs.as_ref(), &target, entry, &self.preserve);
            }
            return Ok(EntryOutcome::Success);
        }

        let (method, aes) = match resolve_method(entry, &local, &local_extra) {
            Ok(resolved) => resolved,
            Err(e) => return self.give_up(name, e),
        };
        log::debug!(
            "'{}': {:?}, {} -> {} bytes",
            name,
            method,
            entry.compressed_size,
            entry.size
        );

        if !request.test_only {
            if let Some(parent) = target.parent() {
                if let Err(outcome) = self.with_retry(name, |fs| fs.create_dir_all(parent))? {
                    return Ok(outcome);
                }
            }
        }

        let mut data_len = entry.compressed_size;
        let encrypted = entry.is_encrypted() || local.flags & flags::ENCRYPTED != 0;
        let cipher = if encrypted {
            if self.policy.is_skipping(ErrorCategory::Encrypted) {
                log::debug!("skipping encrypted entry '{}'", name);
                return Ok(EntryOutcome::Skipped);
            }
            let overhead = match &aes {
                Some(extra) => extra.strength.salt_len() as u64 + AES_VERIFIER_SIZE + AES_MAC_SIZE,
                None => ZIPCRYPTO_HEADER_SIZE,
            };
            let Some(rest) = data_len.checked_sub(overhead) else {
                let e = Error::corrupt_data(name, "compressed size smaller than encryption header");
                return self.give_up(name, e);
            };
            data_len = rest;
            match self.read_cipher(reader, entry, &local, aes.as_ref()) {
                Ok(Unlocked::Cipher(cipher)) => Some(cipher),
                Ok(Unlocked::Done(outcome)) => return Ok(outcome),
                Err(e) => return self.give_up(name, e),
            }
        } else {
            None
        };

        let mut buffers = match self.buffers.take() {
            Some(buffers) => buffers,
            None => DecodeBuffers::new().map_err(|e| decode_error(name, e))?,
        };

        let writer = if request.test_only {
            None
        } else {
            match self.open_output(&target, name)? {
                Ok(writer) => Some(writer),
                Err(outcome) => {
                    self.buffers = Some(buffers);
                    return Ok(outcome);
                }
            }
        };

        let mut source = EntrySource {
            reader,
            remaining: data_len,
            cipher,
        };
        let mut sink = EntrySink {
            crc: Crc32::new(),
            writer,
            progress: &mut *self.progress,
            bytes_done: &mut self.bytes_done,
            total: self.total_bytes,
        };
        let decoded = match decode_entry(
            method,
            entry.size,
            &mut buffers,
            &mut self.tables,
            &mut source,
            &mut sink,
        ) {
            Ok(()) => source.finish(&mut buffers.input[..]),
            // tampered AES data usually decodes as garbage: report the MAC
            Err(e @ (DecodeError::Corrupt(_) | DecodeError::Truncated)) if source.is_aes() => {
                match source.finish(&mut buffers.input[..]) {
                    Err(DecodeError::Authentication) => Err(DecodeError::Authentication),
                    _ => Err(e),
                }
            }
            Err(e) => Err(e),
        };
        self.buffers = Some(buffers);
        let EntrySink { crc, writer, .. } = sink;

        let mut outcome = decoded.map_err(|e| decode_error(name, e));
        if outcome.is_ok() {
            outcome = check_crc(entry, local.crc32, aes.as_ref(), crc.finalize());
        }
        if let Some(mut writer) = writer {
            if outcome.is_ok() {
                outcome = writer.flush().map_err(Error::Io);
            }
        }

        match outcome {
            Ok(()) => {
                if !request.test_only {
                    apply_metadata(self.fs.as_ref(), &target, entry, &self.preserve);
                }
                Ok(EntryOutcome::Success)
            }
            Err(e) => {
                if !request.test_only {
                    self.discard(&target);
                }
                self.give_up(name, e)
            }
        }
    }

    /// Reads the encryption header and finds a matching password.
    fn read_cipher(
        &mut self,
        reader: &mut SpannedReader,
        entry: &DirectoryEntry,
        local: &LocalHeader,
        aes: Option<&AesExtra>,
    ) -> Result<Unlocked> {
        match aes {
            #[cfg(feature = "aes")]
            Some(extra) => {
                let salt_len = extra.strength.salt_len();
                let mut header = vec![0u8; salt_len + AES_VERIFIER_SIZE as usize];
                reader.read_exact(&mut header)?;
                let (salt, verifier) = header.split_at(salt_len);
                let verifier = [verifier[0], verifier[1]];
                let strength = extra.strength;
                Ok(self.unlock(&entry.name, &mut |password: &Password| {
                    AesDecryptor::new(password.as_bytes(), salt, verifier, strength)
                        .map(|decryptor| EntryCipher::Aes(Box::new(decryptor)))
                }))
            }
            _ => {
                let mut header = [0u8; ZIPCRYPTO_HEADER_SIZE as usize];
                reader.read_exact(&mut header)?;
                let check = zipcrypto::check_byte(local.flags, entry.crc32, local.dos_time);
                Ok(self.unlock(&entry.name, &mut |password: &Password| {
                    let mut keys = ZipCryptoKeys::new(password.as_bytes());
                    let mut probe = header;
                    keys.check_header(&mut probe, check)
                        .then_some(EntryCipher::ZipCrypto(keys))
                }))
            }
        }
    }

    /// Creates the output file, honoring the overwrite policy.
    fn open_output(
        &mut self,
        target: &Path,
        name: &str,
    ) -> Result<std::result::Result<Box<dyn Write>, EntryOutcome>> {
        if self.fs.exists(target) {
            match self.overwrite {
                OverwritePolicy::Skip => {
                    log::debug!("'{}' exists, skipping", target.display());
                    return Ok(Err(EntryOutcome::Skipped));
                }
                OverwritePolicy::Error => {
                    // retrying cannot make the file go away
                    let e = io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("'{}' already exists", target.display()),
                    );
                    return self.give_up(name, Error::Io(e)).map(Err);
                }
                OverwritePolicy::Overwrite => {}
            }
        }
        self.with_retry(name, |fs| fs.create_file(target))
    }
}

/// Reads the local header of `entry` and leaves the reader at its data.
fn read_local_header(
    reader: &mut SpannedReader,
    entry: &DirectoryEntry,
) -> Result<(LocalHeader, Vec<u8>)> {
    let mut fixed = [0u8; LocalHeader::SIZE];
    reader.seek_to(entry.disk_start, entry.local_header_offset)?;
    reader.read_exact(&mut fixed)?;
    let local = LocalHeader::parse(&fixed, entry.local_header_offset)?;

    let variable_len = local.name_len as usize + local.extra_len as usize;
    if variable_len > MAX_HEADER_SIZE {
        return Err(Error::corrupt_header(
            entry.local_header_offset,
            "local header name and extra field too large",
        ));
    }
    let mut variable = vec![0u8; variable_len];
    reader.read_exact(&mut variable)?;
    let extra = variable.split_off(local.name_len as usize);
    Ok((local, extra))
}

/// Picks the decoder, looking through the WinZip AES wrapper.
fn resolve_method(
    entry: &DirectoryEntry,
    local: &LocalHeader,
    local_extra: &[u8],
) -> Result<(Method, Option<AesExtra>)> {
    let mut id = entry.method;
    let mut aes = None;
    if entry.method == method_id::AES || local.method == method_id::AES {
        if !cfg!(feature = "aes") {
            return Err(Error::UnsupportedMethod {
                entry_name: entry.name.clone(),
                method: method_id::AES,
            });
        }
        let extra = AesExtra::parse(local_extra).map_err(|reason| Error::BadAesMetadata {
            entry_name: entry.name.clone(),
            reason,
        })?;
        id = extra.method;
        aes = Some(extra);
    }

    let method = Method::from_entry(id, local.flags).ok_or_else(|| Error::UnsupportedMethod {
        entry_name: entry.name.clone(),
        method: id,
    })?;
    Ok((method, aes))
}

/// Accepts either stored CRC; AE-2 entries carry none.
fn check_crc(
    entry: &DirectoryEntry,
    local_crc: u32,
    aes: Option<&AesExtra>,
    actual: u32,
) -> Result<()> {
    if aes.is_some_and(AesExtra::skips_crc) || actual == entry.crc32 || actual == local_crc {
        return Ok(());
    }
    Err(Error::CrcMismatch {
        entry_name: entry.name.clone(),
        expected: entry.crc32,
        actual,
    })
}

fn decode_error(entry_name: &str, error: DecodeError) -> Error {
    match error {
        DecodeError::Corrupt(reason) => Error::corrupt_data(entry_name, reason),
        DecodeError::Truncated => {
            Error::corrupt_data(entry_name, "compressed data ended unexpectedly")
        }
        DecodeError::OutOfMemory => Error::OutOfMemory,
        DecodeError::Authentication => Error::AuthenticationFailed {
            entry_name: entry_name.to_string(),
        },
        DecodeError::Input(e) | DecodeError::Output(e) => e,
        DecodeError::Cancelled => Error::Cancelled,
    }
}

/// Compressed bytes of one entry, decrypted on the way in.
struct EntrySource<'r> {
    reader: &'r mut SpannedReader,
    remaining: u64,
    cipher: Option<EntryCipher>,
}

impl EntrySource<'_> {
    fn is_aes(&self) -> bool {
        #[cfg(feature = "aes")]
        {
            matches!(self.cipher, Some(EntryCipher::Aes(_)))
        }
        #[cfg(not(feature = "aes"))]
        {
            false
        }
    }

    /// Reads what the decoder left behind and checks the AES code.
    fn finish(&mut self, scratch: &mut [u8]) -> DecodeResult<()> {
        if self.is_aes() {
            while self.remaining > 0 {
                self.refill(scratch)?;
            }
            self.authenticate()?;
        }
        Ok(())
    }

    /// Verifies the AES authentication code once the data is consumed.
    #[cfg(feature = "aes")]
    fn authenticate(&mut self) -> DecodeResult<()> {
        let Some(EntryCipher::Aes(decryptor)) = self.cipher.take() else {
            return Ok(());
        };
        let mut stored = [0u8; AES_MAC_SIZE as usize];
        self.reader
            .read_exact(&mut stored)
            .map_err(DecodeError::Input)?;
        if decryptor.verify(&stored) {
            Ok(())
        } else {
            Err(DecodeError::Authentication)
        }
    }

    #[cfg(not(feature = "aes"))]
    fn authenticate(&mut self) -> DecodeResult<()> {
        Ok(())
    }
}

impl Refill for EntrySource<'_> {
    fn refill(&mut self, buf: &mut [u8]) -> DecodeResult<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let n = usize::try_from(self.remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let chunk = &mut buf[..n];
        self.reader.read_exact(chunk).map_err(DecodeError::Input)?;
        if let Some(cipher) = self.cipher.as_mut() {
            cipher.decrypt(chunk);
        }
        self.remaining -= n as u64;
        if self.remaining == 0 {
            self.authenticate()?;
        }
        Ok(n)
    }
}

/// Decompressed output: CRC, optional file and progress.
struct EntrySink<'p> {
    crc: Crc32,
    writer: Option<Box<dyn Write>>,
    progress: &'p mut dyn ProgressReporter,
    bytes_done: &'p mut u64,
    total: u64,
}

impl Flush for EntrySink<'_> {
    fn flush(&mut self, data: &[u8]) -> DecodeResult<()> {
        self.crc.update(data);
        if let Some(writer) = self.writer.as_mut() {
            writer
                .write_all(data)
                .map_err(|e| DecodeError::Output(Error::Io(e)))?;
        }
        *self.bytes_done += data.len() as u64;
        if self.progress.on_progress(*self.bytes_done, self.total) {
            Ok(())
        } else {
            Err(DecodeError::Cancelled)
        }
    }
}
