//! A bare program file: two byte load address followed by the data.

use super::handler::{DriveHandler, FileEntry, FileLocation, FileType};
use super::{DiskError, BLOCK_PAYLOAD};

#[derive(Debug, Clone)]
pub struct PrgImage {
    data: Vec<u8>,
    name: String,
}

impl PrgImage {
    /// Wrap a program, listing it under `name`.
    pub fn named(data: Vec<u8>, name: &str) -> Result<Self, DiskError> {
        if data.len() < 2 {
            return Err(DiskError::Truncated { offset: data.len() });
        }
        Ok(Self {
            data,
            name: name.to_ascii_uppercase(),
        })
    }

    pub fn load_address(&self) -> u16 {
        u16::from_le_bytes([self.data[0], self.data[1]])
    }
}

impl DriveHandler for PrgImage {
    fn mount(bytes: Vec<u8>) -> Result<Self, DiskError> {
        Self::named(bytes, "PROGRAM")
    }

    fn format_name(&self) -> &'static str {
        "PRG"
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn directory_elements(&self) -> Result<Vec<FileEntry>, DiskError> {
        Ok(vec![FileEntry {
            name: self.name.clone(),
            file_type: FileType::Prg,
            blocks: self.data.len().div_ceil(BLOCK_PAYLOAD) as u16,
            location: FileLocation::Offset {
                start: 0,
                len: self.data.len(),
            },
            load_address: None,
            rel: None,
            locked: false,
            closed: true,
            slot: 0,
        }])
    }

    fn read_file(&self, entry: &FileEntry) -> Result<Vec<u8>, DiskError> {
        match entry.location {
            FileLocation::Offset { start, len } => self
                .data
                .get(start..start + len)
                .map(<[u8]>::to_vec)
                .ok_or(DiskError::Truncated {
                    offset: self.data.len(),
                }),
            FileLocation::Block { .. } => {
                Err(DiskError::Unsupported("block entry on PRG".to_string()))
            }
        }
    }
}
