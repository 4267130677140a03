//! Names of the volumes of a spanned archive.

use std::path::{Path, PathBuf};

/// How the volumes of a spanned archive are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeNaming {
    /// `name.z01`, `name.z02`, ..., last volume `name.zip`.
    WinZip,
    /// `name01.zip`, `name02.zip`, ... with the number in the stem.
    Sequential,
}

/// Derives volume paths from the path of the last volume.
#[derive(Debug, Clone)]
pub struct VolumeNames {
    archive_path: PathBuf,
    dir: PathBuf,
    stem: String,
    extension: Option<String>,
    base: String,
    naming: VolumeNaming,
    last_disk: u32,
}

/// Splits trailing ASCII digits off `s`.
fn split_trailing_digits(s: &str) -> (&str, &str) {
    let digits = s.len() - s.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    s.split_at(s.len() - digits)
}

impl VolumeNames {
    /// Creates the naming for an archive whose last disk is `last_disk` (0-based).
    pub fn new(archive_path: &Path, last_disk: u32) -> Self {
        let dir = archive_path.parent().map(Path::to_path_buf).unwrap_or_default();
        let stem = archive_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = archive_path
            .extension()
            .map(|s| s.to_string_lossy().into_owned());

        let (head, digits) = split_trailing_digits(&stem);
        let numbered_as_last = !digits.is_empty()
            && digits.parse::<u64>().ok() == Some(u64::from(last_disk) + 1);
        let is_zip = extension
            .as_deref()
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"));

        let naming = if is_zip && !numbered_as_last {
            VolumeNaming::WinZip
        } else {
            VolumeNaming::Sequential
        };

        let base = if naming == VolumeNaming::Sequential {
            match head.strip_suffix('_') {
                Some(h) if h.ends_with(|c: char| c.is_ascii_digit()) => h.to_string(),
                _ => head.to_string(),
            }
        } else {
            stem.clone()
        };

        Self {
            archive_path: archive_path.to_path_buf(),
            dir,
            stem,
            extension,
            base,
            naming,
            last_disk,
        }
    }

    /// Naming scheme in use.
    pub fn naming(&self) -> VolumeNaming {
        self.naming
    }

    /// Suggested path of `disk` (0-based).
    pub fn path_for(&self, disk: u32) -> PathBuf {
        if disk == self.last_disk {
            return self.archive_path.clone();
        }
        let number = disk + 1;
        let file_name = match self.naming {
            VolumeNaming::WinZip => format!("{}.z{:02}", self.stem, number),
            VolumeNaming::Sequential => {
                let separator = if self.base.ends_with(|c: char| c.is_ascii_digit()) {
                    "_"
                } else {
                    ""
                };
                match &self.extension {
                    Some(ext) => format!("{}{}{:02}.{}", self.base, separator, number, ext),
                    None => format!("{}{}{:02}", self.base, separator, number),
                }
            }
        };
        self.dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winzip_naming() {
        let names = VolumeNames::new(Path::new("/data/backup.zip"), 2);
        assert_eq!(names.naming(), VolumeNaming::WinZip);
        assert_eq!(names.path_for(0), PathBuf::from("/data/backup.z01"));
        assert_eq!(names.path_for(1), PathBuf::from("/data/backup.z02"));
        assert_eq!(names.path_for(2), PathBuf::from("/data/backup.zip"));
    }

    #[test]
    fn test_sequential_naming() {
        let names = VolumeNames::new(Path::new("data03.zip"), 2);
        assert_eq!(names.naming(), VolumeNaming::Sequential);
        assert_eq!(names.path_for(0), PathBuf::from("data01.zip"));
        assert_eq!(names.path_for(1), PathBuf::from("data02.zip"));
        assert_eq!(names.path_for(2), PathBuf::from("data03.zip"));
    }

    #[test]
    fn test_sequential_naming_digit_base() {
        let names = VolumeNames::new(Path::new("set2_03.zip"), 2);
        assert_eq!(names.path_for(0), PathBuf::from("set2_01.zip"));
        assert_eq!(names.path_for(1), PathBuf::from("set2_02.zip"));
    }

    #[test]
    fn test_digits_not_matching_last_volume_use_winzip() {
        let names = VolumeNames::new(Path::new("report2024.zip"), 1);
        assert_eq!(names.naming(), VolumeNaming::WinZip);
        assert_eq!(names.path_for(0), PathBuf::from("report2024.z01"));
    }

    #[test]
    fn test_other_extension_is_sequential() {
        let names = VolumeNames::new(Path::new("disk3.bin"), 2);
        assert_eq!(names.naming(), VolumeNaming::Sequential);
        assert_eq!(names.path_for(0), PathBuf::from("disk01.bin"));
    }
}
