//! The interface every disk or tape image format implements.

use std::fmt;

use super::DiskError;

/// CBM DOS file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Del,
    Seq,
    Prg,
    Usr,
    Rel,
}

impl FileType {
    /// Low three bits of a directory entry's type byte.
    pub fn from_code(code: u8) -> Option<Self> {
        match code & 0x07 {
            0 => Some(FileType::Del),
            1 => Some(FileType::Seq),
            2 => Some(FileType::Prg),
            3 => Some(FileType::Usr),
            4 => Some(FileType::Rel),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            FileType::Del => 0,
            FileType::Seq => 1,
            FileType::Prg => 2,
            FileType::Usr => 3,
            FileType::Rel => 4,
        }
    }

    /// Type letter used in filenames (`NAME,P`).
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'D' => Some(FileType::Del),
            'S' => Some(FileType::Seq),
            'P' => Some(FileType::Prg),
            'U' => Some(FileType::Usr),
            'R' | 'L' => Some(FileType::Rel),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FileType::Del => "DEL",
            FileType::Seq => "SEQ",
            FileType::Prg => "PRG",
            FileType::Usr => "USR",
            FileType::Rel => "REL",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a file's data lives inside its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileLocation {
    /// First block of a sector chain.
    Block { track: u8, sector: u8 },
    /// Flat byte range of a tape image.
    Offset { start: usize, len: usize },
}

/// Record layout of a relative file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelInfo {
    pub record_length: u8,
    pub side_track: u8,
    pub side_sector: u8,
}

/// One directory entry as seen through a [`DriveHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub file_type: FileType,
    pub blocks: u16,
    pub location: FileLocation,
    /// Load address for tape entries, which store it outside the data.
    pub load_address: Option<u16>,
    pub rel: Option<RelInfo>,
    pub locked: bool,
    /// Cleared for files that were never closed ("splat" files).
    pub closed: bool,
    /// Position in the directory, counted from zero.
    pub slot: usize,
}

impl FileEntry {
    pub fn track_sector(&self) -> (u8, u8) {
        match self.location {
            FileLocation::Block { track, sector } => (track, sector),
            FileLocation::Offset { .. } => (0, 0),
        }
    }
}

/// A mounted image.
///
/// Read access is mandatory. Mutating operations default to
/// [`DiskError::WriteProtected`], and block access defaults to
/// [`DiskError::Unsupported`], so read-only formats only implement the
/// read half.
pub trait DriveHandler: Send {
    /// Parse an image.
    fn mount(bytes: Vec<u8>) -> Result<Self, DiskError>
    where
        Self: Sized;

    /// Short name of the format ("D64", "T64", ...).
    fn format_name(&self) -> &'static str;

    /// Disk or tape name.
    fn label(&self) -> String;

    /// Two character disk ID shown in directory listings.
    fn disk_id(&self) -> [u8; 2] {
        *b"  "
    }

    /// Current image contents, for delta files and snapshots.
    fn bytes(&self) -> &[u8];

    fn directory_elements(&self) -> Result<Vec<FileEntry>, DiskError>;

    /// File contents as stored; PRG files start with their load address.
    fn read_file(&self, entry: &FileEntry) -> Result<Vec<u8>, DiskError>;

    fn free_blocks(&self) -> u16 {
        0
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn write_file(
        &mut self,
        _name: &str,
        _file_type: FileType,
        _data: &[u8],
    ) -> Result<FileEntry, DiskError> {
        Err(DiskError::WriteProtected)
    }

    fn delete_file(&mut self, _entry: &FileEntry) -> Result<(), DiskError> {
        Err(DiskError::WriteProtected)
    }

    fn rename_file(&mut self, _entry: &FileEntry, _new_name: &str) -> Result<(), DiskError> {
        Err(DiskError::WriteProtected)
    }

    /// Erase the image. Without an `id` the current ID is kept.
    fn format(&mut self, _name: &str, _id: Option<[u8; 2]>) -> Result<(), DiskError> {
        Err(DiskError::WriteProtected)
    }

    /// Rebuild the allocation map from the files that are reachable.
    fn validate(&mut self) -> Result<(), DiskError> {
        Err(DiskError::WriteProtected)
    }

    fn read_block(&self, _track: u8, _sector: u8) -> Result<[u8; 256], DiskError> {
        Err(DiskError::Unsupported(self.format_name().to_string()))
    }

    fn write_block(&mut self, _track: u8, _sector: u8, _data: &[u8; 256]) -> Result<(), DiskError> {
        Err(DiskError::WriteProtected)
    }

    fn allocate(&mut self, _track: u8, _sector: u8) -> Result<(), DiskError> {
        Err(DiskError::WriteProtected)
    }

    fn free(&mut self, _track: u8, _sector: u8) -> Result<(), DiskError> {
        Err(DiskError::WriteProtected)
    }
}

impl fmt::Debug for dyn DriveHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriveHandler")
            .field("format", &self.format_name())
            .field("label", &self.label())
            .field("len", &self.bytes().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes() {
        assert_eq!(FileType::from_code(0x82), Some(FileType::Prg));
        assert_eq!(FileType::from_code(0xC1), Some(FileType::Seq));
        assert_eq!(FileType::from_code(0x87), None);
        assert_eq!(FileType::Usr.code(), 3);
    }

    #[test]
    fn test_type_letters() {
        assert_eq!(FileType::from_letter('p'), Some(FileType::Prg));
        assert_eq!(FileType::from_letter('L'), Some(FileType::Rel));
        assert_eq!(FileType::from_letter('X'), None);
    }
}
