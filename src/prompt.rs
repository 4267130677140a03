//! Host prompts for passwords and volumes.
//!
//! Both prompts are modal with respect to the extraction call: the engine
//! blocks until the callback returns.

use std::path::{Path, PathBuf};

use crate::crypto::Password;

/// Answer to a password request.
#[derive(Debug, Clone)]
pub enum PasswordReply {
    /// Try this password.
    Password(Password),
    /// Skip this entry.
    Skip,
    /// Skip this entry and every later encrypted entry without a cached password.
    SkipAll,
    /// Give up on this entry.
    Cancel,
}

/// Host callback supplying passwords for encrypted entries.
///
/// The engine only calls the prompt after every cached password failed. A
/// wrong password leads to another call for the same entry.
pub trait PasswordPrompt {
    /// Asks for the password of `entry_name`.
    fn prompt_password(&mut self, entry_name: &str) -> PasswordReply;
}

/// Password prompt that always skips.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPasswordPrompt;

impl PasswordPrompt for NoPasswordPrompt {
    fn prompt_password(&mut self, entry_name: &str) -> PasswordReply {
        log::debug!("no password available for {}", entry_name);
        PasswordReply::Skip
    }
}

impl<F> PasswordPrompt for F
where
    F: FnMut(&str) -> PasswordReply,
{
    fn prompt_password(&mut self, entry_name: &str) -> PasswordReply {
        self(entry_name)
    }
}

/// Host callback locating the volumes of a spanned archive.
pub trait VolumePrompt {
    /// Asks for volume `volume` (1-based).
    ///
    /// `suggested` is the name derived from the archive path. Returning
    /// `None` cancels the read that needed the volume.
    fn request_volume(&mut self, volume: u32, suggested: &Path) -> Option<PathBuf>;
}

/// Volume prompt that accepts the suggested name when that file exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoVolumes;

impl VolumePrompt for AutoVolumes {
    fn request_volume(&mut self, volume: u32, suggested: &Path) -> Option<PathBuf> {
        if suggested.is_file() {
            Some(suggested.to_path_buf())
        } else {
            log::warn!("volume {} not found at {}", volume, suggested.display());
            None
        }
    }
}

impl<F> VolumePrompt for F
where
    F: FnMut(u32, &Path) -> Option<PathBuf>,
{
    fn request_volume(&mut self, volume: u32, suggested: &Path) -> Option<PathBuf> {
        self(volume, suggested)
    }
}
