//! File-access capability used by the extraction engine.
//!
//! The engine never calls `std::fs` directly. Every archive read, directory
//! creation, output write and metadata update goes through a [`FileSystem`],
//! so hosts can redirect output (for example into a virtual file system or
//! a sandbox) and tests can inject failures.
//!
//! [`StdFileSystem`] is the default and maps every operation to `std::fs`
//! and `filetime`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::Path;
use std::time::SystemTime;

/// A readable, seekable archive volume.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// File operations required by the extraction engine.
pub trait FileSystem {
    /// Opens an archive volume for reading.
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>>;

    /// Creates `path` and all missing parents. Succeeds if it already exists.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Creates or truncates an output file.
    fn create_file(&self, path: &Path) -> io::Result<Box<dyn Write>>;

    /// Removes a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Returns `true` if something exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Sets the modification time of a file or directory.
    fn set_modified(&self, path: &Path, time: SystemTime) -> io::Result<()>;

    /// Applies stored attributes.
    ///
    /// `dos_attributes` holds the DOS attribute bits; `unix_mode` is present
    /// when the entry was produced on a Unix host.
    fn set_attributes(
        &self,
        path: &Path,
        dos_attributes: u16,
        unix_mode: Option<u32>,
    ) -> io::Result<()>;
}

/// [`FileSystem`] backed by the standard library.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>> {
        Ok(Box::new(io::BufReader::new(File::open(path)?)))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn create_file(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Box::new(io::BufWriter::new(file)))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.symlink_metadata().is_ok()
    }

    fn set_modified(&self, path: &Path, time: SystemTime) -> io::Result<()> {
        filetime::set_file_mtime(path, filetime::FileTime::from_system_time(time))
    }

    #[cfg(unix)]
    fn set_attributes(
        &self,
        path: &Path,
        _dos_attributes: u16,
        unix_mode: Option<u32>,
    ) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        if let Some(mode) = unix_mode {
            let perms = fs::Permissions::from_mode(mode & 0o7777);
            fs::set_permissions(path, perms)?;
        }
        Ok(())
    }

    #[cfg(windows)]
    fn set_attributes(
        &self,
        path: &Path,
        dos_attributes: u16,
        _unix_mode: Option<u32>,
    ) -> io::Result<()> {
        const FILE_ATTRIBUTE_READONLY: u16 = 0x01;

        let mut perms = fs::metadata(path)?.permissions();
        perms.set_readonly(dos_attributes & FILE_ATTRIBUTE_READONLY != 0);
        fs::set_permissions(path, perms)
    }

    #[cfg(not(any(unix, windows)))]
    fn set_attributes(
        &self,
        _path: &Path,
        _dos_attributes: u16,
        _unix_mode: Option<u32>,
    ) -> io::Result<()> {
        Ok(())
    }
}
