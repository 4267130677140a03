//! MS-DOS timestamps as stored in ZIP headers.
//!
//! ZIP records the last-modification time as two packed 16-bit words:
//!
//! - date: bits 15-9 year since 1980, bits 8-5 month, bits 4-0 day
//! - time: bits 15-11 hour, bits 10-5 minute, bits 4-0 seconds / 2
//!
//! The format carries no time zone. This crate interprets it as UTC. A value
//! that does not describe a real calendar date maps to the earliest
//! representable time, 1980-01-01 00:00:00.
//!
//! # Example
//!
//! ```rust
//! use zunpack::DosDateTime;
//!
//! // 2024-03-15 12:30:44
//! let ts = DosDateTime::new((44 << 9) | (3 << 5) | 15, (12 << 11) | (30 << 5) | 22);
//! assert!(ts.is_valid());
//! assert_eq!(ts.year(), 2024);
//! assert_eq!(ts.second(), 44);
//! assert_eq!(ts.as_unix_secs(), 1_710_505_844);
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Unix time of 1980-01-01 00:00:00 UTC, the earliest DOS timestamp.
pub const MIN_DOS_UNIX_SECS: i64 = 315_532_800;

/// A packed DOS date and time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DosDateTime {
    date: u16,
    time: u16,
}

impl DosDateTime {
    /// Creates a timestamp from the raw header words.
    pub const fn new(date: u16, time: u16) -> Self {
        Self { date, time }
    }

    /// Returns the raw date word.
    pub const fn date(&self) -> u16 {
        self.date
    }

    /// Returns the raw time word.
    pub const fn time(&self) -> u16 {
        self.time
    }

    /// Calendar year (1980-2107).
    pub fn year(&self) -> u32 {
        1980 + (self.date >> 9) as u32
    }

    /// Month (1-12 when valid).
    pub fn month(&self) -> u32 {
        ((self.date >> 5) & 0x0F) as u32
    }

    /// Day of month (1-31 when valid).
    pub fn day(&self) -> u32 {
        (self.date & 0x1F) as u32
    }

    /// Hour (0-23 when valid).
    pub fn hour(&self) -> u32 {
        (self.time >> 11) as u32
    }

    /// Minute (0-59 when valid).
    pub fn minute(&self) -> u32 {
        ((self.time >> 5) & 0x3F) as u32
    }

    /// Second, always even.
    pub fn second(&self) -> u32 {
        ((self.time & 0x1F) as u32) * 2
    }

    /// Returns `true` if the fields describe a real date and time.
    pub fn is_valid(&self) -> bool {
        let month = self.month();
        if !(1..=12).contains(&month) {
            return false;
        }
        let day = self.day();
        day >= 1
            && day <= days_in_month(self.year(), month)
            && self.hour() < 24
            && self.minute() < 60
            && self.second() < 60
    }

    /// Returns seconds since the Unix epoch, treating the value as UTC.
    ///
    /// Invalid values return [`MIN_DOS_UNIX_SECS`].
    pub fn as_unix_secs(&self) -> i64 {
        if !self.is_valid() {
            return MIN_DOS_UNIX_SECS;
        }
        let days = days_from_civil(self.year() as i64, self.month(), self.day());
        days * 86_400
            + self.hour() as i64 * 3_600
            + self.minute() as i64 * 60
            + self.second() as i64
    }

    /// Converts to a [`SystemTime`].
    pub fn as_system_time(&self) -> SystemTime {
        // DOS years start at 1980, so the value is never before the epoch.
        UNIX_EPOCH + Duration::from_secs(self.as_unix_secs() as u64)
    }
}

fn is_leap(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap(year) => 29,
        _ => 28,
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let m = month as i64;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(y: u16, mo: u16, d: u16, h: u16, mi: u16, s: u16) -> DosDateTime {
        DosDateTime::new(((y - 1980) << 9) | (mo << 5) | d, (h << 11) | (mi << 5) | (s / 2))
    }

    #[test]
    fn test_minimum() {
        let ts = pack(1980, 1, 1, 0, 0, 0);
        assert!(ts.is_valid());
        assert_eq!(ts.as_unix_secs(), MIN_DOS_UNIX_SECS);
    }

    #[test]
    fn test_leap_day() {
        let ts = pack(2000, 2, 29, 23, 59, 58);
        assert!(ts.is_valid());
        assert_eq!(ts.as_unix_secs(), 951_868_798);
        assert!(!pack(2001, 2, 29, 0, 0, 0).is_valid());
    }

    #[test]
    fn test_invalid_falls_back_to_minimum() {
        let zero = DosDateTime::new(0, 0);
        assert!(!zero.is_valid());
        assert_eq!(zero.as_unix_secs(), MIN_DOS_UNIX_SECS);

        let bad_hour = DosDateTime::new(pack(2010, 5, 5, 0, 0, 0).date(), 25 << 11);
        assert_eq!(bad_hour.as_unix_secs(), MIN_DOS_UNIX_SECS);
    }

    #[test]
    fn test_system_time() {
        let ts = pack(2024, 3, 15, 12, 30, 44);
        let secs = ts
            .as_system_time()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert_eq!(secs, 1_710_505_844);
    }
}
