//! High-level 1541 disk drives.
//!
//! The drives work at the file level rather than emulating the 1541's own
//! 6502: the machine traps the KERNAL serial routines and hands LISTEN,
//! TALK and data bytes to the [`IecBus`], which routes them to a [`Drive`].
//! Each drive holds one image behind the [`DriveHandler`] trait.
//!
//! Supported images:
//! - D64 sector images (read/write)
//! - T64 tape archives, raw PRG files and P00 files (read-only, presented
//!   as a disk through [`TapeAdapter`])
//!
//! Disk command failures are reported the way the drive does, as a status
//! string on channel 15. [`DiskError::status`] gives the string for each
//! error.

mod channel;
mod d64;
mod delta;
mod detect;
mod drive;
mod handler;
mod iec;
mod p00;
mod pattern;
mod petscii;
mod prg;
mod status;
mod t64;
mod tape_adapter;

use thiserror::Error;

pub use channel::{ChannelMode, DriveChannel, PendingFile};
pub use d64::{
    sectors_in_track, D64Image, BLOCK_PAYLOAD, D64_SIZE, D64_SIZE_WITH_ERRORS, DIRECTORY_TRACK,
    TOTAL_BLOCKS, TRACKS,
};
pub use delta::{apply_delta, create_delta, MAX_VARINT};
pub use detect::{detect_format, open_image, ImageFormat};
pub use drive::{Drive, DriveState, COMMAND_CHANNEL, FIRST_DEVICE};
pub use handler::{DriveHandler, FileEntry, FileLocation, FileType, RelInfo};
pub use iec::{IecBus, IecState, STATUS_DEVICE_NOT_PRESENT, STATUS_EOI, STATUS_READ_TIMEOUT};
pub use p00::P00Image;
pub use pattern::{matches, name_matches, Pattern};
pub use petscii::{ascii_to_petscii, petscii_to_ascii};
pub use prg::PrgImage;
pub use status::DriveStatus;
pub use t64::T64Image;
pub use tape_adapter::TapeAdapter;

/// Errors from image parsing and disk operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiskError {
    #[error("invalid {format} image size: {got} bytes")]
    BadSize { format: &'static str, got: usize },
    #[error("image data ends early at offset {offset}")]
    Truncated { offset: usize },
    #[error("read error at track {track}, sector {sector}")]
    ReadError { track: u8, sector: u8 },
    #[error("illegal track {track} or sector {sector}")]
    IllegalTrackSector { track: u8, sector: u8 },
    #[error("block in use, next free is {track}/{sector}")]
    NoBlock { track: u8, sector: u8 },
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("file exists: {0}")]
    FileExists(String),
    #[error("disk full")]
    DiskFull,
    #[error("directory full")]
    DirectoryFull,
    #[error("image is write protected")]
    WriteProtected,
    #[error("unsupported format: {0}")]
    Unsupported(String),
    #[error("corrupted image: {0}")]
    Corrupt(String),
    #[error("malformed delta at offset {offset}")]
    BadDelta { offset: usize },
    #[error("image lengths differ: {expected} vs {got}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("no image in drive")]
    NotReady,
}

impl DiskError {
    /// The drive status a program sees for this error.
    pub fn status(&self) -> DriveStatus {
        match self {
            DiskError::Truncated { .. }
            | DiskError::Corrupt(_)
            | DiskError::BadDelta { .. }
            | DiskError::LengthMismatch { .. }
            | DiskError::BadSize { .. } => DriveStatus::read_error(0, 0),
            DiskError::ReadError { track, sector } => DriveStatus::read_error(*track, *sector),
            DiskError::IllegalTrackSector { track, sector } => {
                DriveStatus::illegal_track_or_sector(*track, *sector)
            }
            DiskError::NoBlock { track, sector } => DriveStatus::no_block(*track, *sector),
            DiskError::FileNotFound(_) => DriveStatus::file_not_found(),
            DiskError::FileExists(_) => DriveStatus::file_exists(),
            DiskError::DiskFull | DiskError::DirectoryFull => DriveStatus::disk_full(),
            DiskError::WriteProtected => DriveStatus::write_protect_on(),
            DiskError::Unsupported(_) | DiskError::NotReady => DriveStatus::drive_not_ready(),
        }
    }
}
