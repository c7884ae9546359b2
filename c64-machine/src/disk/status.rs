//! Error channel messages.
//!
//! Programs parse these strings, so the text is fixed: two-digit code,
//! message, two-digit track and sector, joined by commas. Reading the
//! string over channel 15 appends a carriage return.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveStatus {
    pub code: u8,
    pub message: &'static str,
    pub track: u8,
    pub sector: u8,
}

impl DriveStatus {
    const fn new(code: u8, message: &'static str) -> Self {
        Self {
            code,
            message,
            track: 0,
            sector: 0,
        }
    }

    /// Same status reported at a block address.
    pub const fn at(self, track: u8, sector: u8) -> Self {
        Self {
            track,
            sector,
            ..self
        }
    }

    pub const fn ok() -> Self {
        Self::new(0, "OK")
    }

    /// `count` files removed by a scratch command, reported in the track
    /// field.
    pub const fn files_scratched(count: u8) -> Self {
        Self::new(1, "FILES SCRATCHED").at(count, 0)
    }

    pub const fn read_error(track: u8, sector: u8) -> Self {
        Self::new(20, "READ ERROR").at(track, sector)
    }

    pub const fn write_protect_on() -> Self {
        Self::new(26, "WRITE PROTECT ON")
    }

    /// Malformed command parameters.
    pub const fn syntax_error() -> Self {
        Self::new(30, "SYNTAX ERROR")
    }

    /// Unknown command.
    pub const fn invalid_command() -> Self {
        Self::new(31, "SYNTAX ERROR")
    }

    /// Command longer than the drive's 58 byte command buffer.
    pub const fn command_too_long() -> Self {
        Self::new(32, "SYNTAX ERROR")
    }

    /// Wildcard where a definite name is required.
    pub const fn invalid_filename() -> Self {
        Self::new(33, "SYNTAX ERROR")
    }

    /// Filename missing.
    pub const fn no_filename() -> Self {
        Self::new(34, "SYNTAX ERROR")
    }

    /// Source file of a copy or rename is missing.
    pub const fn source_not_found() -> Self {
        Self::new(39, "FILE NOT FOUND")
    }

    pub const fn file_not_open() -> Self {
        Self::new(61, "FILE NOT OPEN")
    }

    pub const fn file_not_found() -> Self {
        Self::new(62, "FILE NOT FOUND")
    }

    pub const fn file_exists() -> Self {
        Self::new(63, "FILE EXISTS")
    }

    /// Block already in use; the address is the next free block.
    pub const fn no_block(track: u8, sector: u8) -> Self {
        Self::new(65, "NO BLOCK").at(track, sector)
    }

    pub const fn illegal_track_or_sector(track: u8, sector: u8) -> Self {
        Self::new(66, "ILLEGAL TRACK OR SECTOR").at(track, sector)
    }

    pub const fn no_channel() -> Self {
        Self::new(70, "NO CHANNEL")
    }

    pub const fn disk_full() -> Self {
        Self::new(72, "DISK FULL")
    }

    /// Power-on message, also reported after a `UJ` reset.
    pub const fn dos_version() -> Self {
        Self::new(73, "CBM DOS V2.6 1541")
    }

    pub const fn drive_not_ready() -> Self {
        Self::new(74, "DRIVE NOT READY")
    }

    pub fn is_ok(&self) -> bool {
        self.code < 20
    }
}

impl Default for DriveStatus {
    fn default() -> Self {
        Self::ok()
    }
}

impl fmt::Display for DriveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02},{},{:02},{:02}",
            self.code, self.message, self.track, self.sector
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(DriveStatus::ok().to_string(), "00,OK,00,00");
        assert_eq!(
            DriveStatus::files_scratched(3).to_string(),
            "01,FILES SCRATCHED,03,00"
        );
        assert_eq!(
            DriveStatus::dos_version().to_string(),
            "73,CBM DOS V2.6 1541,00,00"
        );
        assert_eq!(
            DriveStatus::illegal_track_or_sector(36, 1).to_string(),
            "66,ILLEGAL TRACK OR SECTOR,36,01"
        );
        assert_eq!(
            DriveStatus::invalid_command().to_string(),
            "31,SYNTAX ERROR,00,00"
        );
    }

    #[test]
    fn test_ok_class() {
        assert!(DriveStatus::files_scratched(0).is_ok());
        assert!(!DriveStatus::file_not_found().is_ok());
    }
}
