//! PC64 container files (`.P00`, `.S00`, ...).
//!
//! Header: `C64File\0`, the original 16 character PETSCII name, a zero
//! byte and the REL record length, followed by the file itself.

use super::handler::{DriveHandler, FileEntry, FileLocation, FileType};
use super::petscii::decode_name;
use super::{DiskError, BLOCK_PAYLOAD};

pub const P00_MAGIC: &[u8; 8] = b"C64File\0";
const HEADER_SIZE: usize = 26;

#[derive(Debug, Clone)]
pub struct P00Image {
    data: Vec<u8>,
    file_type: FileType,
}

impl P00Image {
    /// The container does not record the type; the extension letter does.
    pub fn with_file_type(mut self, file_type: FileType) -> Self {
        self.file_type = file_type;
        self
    }

    pub fn file_name(&self) -> String {
        decode_name(&self.data[8..24])
    }

    pub fn record_length(&self) -> u8 {
        self.data[25]
    }
}

impl DriveHandler for P00Image {
    fn mount(bytes: Vec<u8>) -> Result<Self, DiskError> {
        if bytes.len() < HEADER_SIZE {
            return Err(DiskError::Truncated {
                offset: bytes.len(),
            });
        }
        if !bytes.starts_with(P00_MAGIC) {
            return Err(DiskError::Unsupported("missing P00 signature".to_string()));
        }
        Ok(Self {
            data: bytes,
            file_type: FileType::Prg,
        })
    }

    fn format_name(&self) -> &'static str {
        "P00"
    }

    fn label(&self) -> String {
        self.file_name()
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn directory_elements(&self) -> Result<Vec<FileEntry>, DiskError> {
        let len = self.data.len() - HEADER_SIZE;
        Ok(vec![FileEntry {
            name: self.file_name(),
            file_type: self.file_type,
            blocks: len.div_ceil(BLOCK_PAYLOAD) as u16,
            location: FileLocation::Offset {
                start: HEADER_SIZE,
                len,
            },
            load_address: None,
            rel: None,
            locked: false,
            closed: true,
            slot: 0,
        }])
    }

    fn read_file(&self, entry: &FileEntry) -> Result<Vec<u8>, DiskError> {
        let FileLocation::Offset { start, len } = entry.location else {
            return Err(DiskError::Unsupported("block entry on P00".to_string()));
        };
        self.data
            .get(start..start + len)
            .map(<[u8]>::to_vec)
            .ok_or(DiskError::Truncated {
                offset: self.data.len(),
            })
    }
}
