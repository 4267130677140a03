//! Reader that follows an archive across volume boundaries.

use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::naming::VolumeNames;
use crate::fs::{FileSystem, ReadSeek};
use crate::prompt::VolumePrompt;
use crate::{Error, Result};

/// Which volume is open and which ones were visited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeState {
    /// Current disk (0-based).
    pub current: u32,
    /// The archive spans several volumes.
    pub multi_volume: bool,
    /// Paths of every volume opened so far, in first-open order.
    pub touched: Vec<PathBuf>,
}

/// Reads archive bytes addressed as `(disk, offset)`.
///
/// On single-volume archives every address is on disk 0 and running out of
/// data is [`Error::UnexpectedEof`]. On spanned archives a short read
/// continues at offset 0 of the next volume, which is requested through the
/// [`VolumePrompt`].
pub struct SpannedReader {
    fs: Arc<dyn FileSystem>,
    prompt: Box<dyn VolumePrompt>,
    archive_path: PathBuf,
    names: Option<VolumeNames>,
    last_disk: u32,
    handle: Option<Box<dyn ReadSeek>>,
    position: u64,
    state: VolumeState,
}

impl std::fmt::Debug for SpannedReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpannedReader")
            .field("archive_path", &self.archive_path)
            .field("last_disk", &self.last_disk)
            .field("position", &self.position)
            .field("state", &self.state)
            .finish()
    }
}

impl SpannedReader {
    /// Opens the archive file the caller named.
    ///
    /// For spanned archives this is the last volume, the one holding the
    /// end of central directory record.
    pub fn open(
        fs: Arc<dyn FileSystem>,
        prompt: Box<dyn VolumePrompt>,
        archive_path: &Path,
    ) -> Result<Self> {
        let handle = fs.open_read(archive_path)?;
        Ok(Self {
            fs,
            prompt,
            archive_path: archive_path.to_path_buf(),
            names: None,
            last_disk: 0,
            handle: Some(handle),
            position: 0,
            state: VolumeState {
                current: 0,
                multi_volume: false,
                touched: vec![archive_path.to_path_buf()],
            },
        })
    }

    /// Switches to multi-volume mode once the directory names the last disk.
    ///
    /// The file opened so far becomes `last_disk`.
    pub fn set_multi_volume(&mut self, last_disk: u32) {
        log::debug!("spanned archive with {} volumes", last_disk + 1);
        self.names = Some(VolumeNames::new(&self.archive_path, last_disk));
        self.last_disk = last_disk;
        self.state.current = last_disk;
        self.state.multi_volume = true;
    }

    /// Volume bookkeeping.
    pub fn state(&self) -> &VolumeState {
        &self.state
    }

    /// `true` when the archive spans several volumes.
    pub fn is_multi_volume(&self) -> bool {
        self.state.multi_volume
    }

    /// Index of the last disk.
    pub fn last_disk(&self) -> u32 {
        self.last_disk
    }

    /// Current disk and the offset the next read starts at.
    pub fn position(&self) -> (u32, u64) {
        (self.state.current, self.position)
    }

    /// Length of the current volume.
    pub fn current_len(&mut self) -> Result<u64> {
        let len = self.current_handle()?.seek(SeekFrom::End(0))?;
        let position = self.position;
        self.current_handle()?.seek(SeekFrom::Start(position))?;
        Ok(len)
    }

    fn current_handle(&mut self) -> Result<&mut Box<dyn ReadSeek>> {
        if self.handle.is_none() {
            let disk = self.state.current;
            self.change_volume(disk)?;
        }
        self.handle
            .as_mut()
            .ok_or_else(|| Error::InvalidFormat("no volume open".to_string()))
    }

    /// Makes `disk` the current volume.
    ///
    /// The current handle is closed first. The last disk is the file the
    /// archive was opened from; every other volume goes through the prompt.
    /// A cancelled prompt is [`Error::VolumeMissing`].
    pub fn change_volume(&mut self, disk: u32) -> Result<()> {
        if self.handle.is_some() && self.state.current == disk {
            return Ok(());
        }
        if disk > self.last_disk {
            return Err(Error::InvalidFormat(format!(
                "disk {} beyond last disk {}",
                disk, self.last_disk
            )));
        }
        self.handle = None;

        let path = match &self.names {
            Some(names) if disk != self.last_disk => {
                let suggested = names.path_for(disk);
                self.prompt
                    .request_volume(disk + 1, &suggested)
                    .ok_or(Error::VolumeMissing {
                        volume: disk + 1,
                        path: suggested,
                    })?
            }
            _ => self.archive_path.clone(),
        };

        let mut handle = self.fs.open_read(&path)?;
        let len = handle.seek(SeekFrom::End(0))?;
        if len == 0 {
            log::warn!("volume {} is empty: {}", disk + 1, path.display());
            return Err(Error::VolumeMissing {
                volume: disk + 1,
                path,
            });
        }
        handle.seek(SeekFrom::Start(0))?;
        log::debug!("switched to volume {} ({})", disk + 1, path.display());

        if !self.state.touched.contains(&path) {
            self.state.touched.push(path);
        }
        self.state.current = disk;
        self.position = 0;
        self.handle = Some(handle);
        Ok(())
    }

    /// Positions the reader at `offset` on `disk`.
    pub fn seek_to(&mut self, disk: u32, offset: u64) -> Result<()> {
        self.change_volume(disk)?;
        self.current_handle()?.seek(SeekFrom::Start(offset))?;
        self.position = offset;
        Ok(())
    }

    /// Reads at least one byte into a non-empty `buf`.
    ///
    /// End of a volume continues on the next one; end of the last volume is
    /// [`Error::UnexpectedEof`].
    pub fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let n = self.current_handle()?.read(buf)?;
            if n > 0 {
                self.position += n as u64;
                return Ok(n);
            }
            if !self.state.multi_volume || self.state.current >= self.last_disk {
                return Err(Error::UnexpectedEof {
                    offset: self.position,
                });
            }
            let next = self.state.current + 1;
            self.seek_to(next, 0)?;
        }
    }

    /// Fills `buf` from the current position.
    pub fn read_exact(&mut self, mut buf: &mut [u8]) -> Result<()> {
        while !buf.is_empty() {
            let n = self.read_some(buf)?;
            buf = &mut buf[n..];
        }
        Ok(())
    }

    /// Fills `buf` starting at `offset` on `disk`.
    pub fn read_exact_at(&mut self, disk: u32, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.seek_to(disk, offset)?;
        self.read_exact(buf)
    }

    /// Reads the last `len` bytes of the current volume.
    ///
    /// Returns the offset of the first returned byte.
    pub fn read_tail(&mut self, len: u64) -> Result<(u64, Vec<u8>)> {
        let volume_len = self.current_len()?;
        let len = len.min(volume_len);
        let start = volume_len - len;
        let mut buf = vec![0u8; len as usize];
        let disk = self.state.current;
        self.read_exact_at(disk, start, &mut buf)?;
        Ok((start, buf))
    }
}
