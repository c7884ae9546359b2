//! T64 tape archives.
//!
//! A 64 byte header, a table of 32 byte directory entries, then the file
//! data. Entries address their data by absolute file offset and store the
//! load range instead of a length.

use super::handler::{DriveHandler, FileEntry, FileLocation, FileType};
use super::petscii::petscii_to_ascii;
use super::{DiskError, BLOCK_PAYLOAD};

const HEADER_SIZE: usize = 64;
const ENTRY_SIZE: usize = 32;
const MAGIC: &[u8] = b"C64";

#[derive(Debug, Clone)]
pub struct T64Image {
    data: Vec<u8>,
    entries: usize,
}

fn field_name(bytes: &[u8]) -> String {
    let name: String = bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| petscii_to_ascii(b))
        .collect();
    name.trim_end().to_string()
}

impl T64Image {
    fn u16_at(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.data[offset], self.data[offset + 1]])
    }

    fn u32_at(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ])
    }

    pub fn version(&self) -> u16 {
        self.u16_at(0x20)
    }

    fn entry(&self, index: usize, slot: usize) -> Result<Option<FileEntry>, DiskError> {
        let base = HEADER_SIZE + index * ENTRY_SIZE;
        let raw = &self.data[base..base + ENTRY_SIZE];
        if raw[0] == 0 {
            return Ok(None);
        }
        // Some tools write 1 for PRG instead of $82.
        let file_type = match raw[1] {
            0x00 | 0x01 => FileType::Prg,
            code => FileType::from_code(code).unwrap_or(FileType::Prg),
        };
        let start = self.u16_at(base + 2);
        let end = self.u16_at(base + 4);
        if end < start {
            return Err(DiskError::Corrupt(format!(
                "T64 entry {} ends at ${:04X} before it starts at ${:04X}",
                index, end, start
            )));
        }
        let offset = self.u32_at(base + 8) as usize;
        if offset > self.data.len() {
            return Err(DiskError::Truncated {
                offset: self.data.len(),
            });
        }
        // Many tools wrote a bogus end address; the data ends with the file.
        let len = usize::from(end - start).min(self.data.len() - offset);
        let blocks = (len + 2).div_ceil(BLOCK_PAYLOAD) as u16;
        Ok(Some(FileEntry {
            name: field_name(&raw[0x10..0x20]),
            file_type,
            blocks,
            location: FileLocation::Offset {
                start: offset,
                len,
            },
            load_address: Some(start),
            rel: None,
            locked: false,
            closed: true,
            slot,
        }))
    }
}

impl DriveHandler for T64Image {
    fn mount(bytes: Vec<u8>) -> Result<Self, DiskError> {
        if bytes.len() < HEADER_SIZE {
            return Err(DiskError::Truncated {
                offset: bytes.len(),
            });
        }
        if !bytes.starts_with(MAGIC) {
            return Err(DiskError::Unsupported("missing T64 signature".to_string()));
        }
        let max_entries = u16::from_le_bytes([bytes[0x22], bytes[0x23]]) as usize;
        let used = u16::from_le_bytes([bytes[0x24], bytes[0x25]]) as usize;
        let entries = max_entries.max(used);
        let table_end = HEADER_SIZE + entries * ENTRY_SIZE;
        if table_end > bytes.len() {
            return Err(DiskError::Truncated {
                offset: bytes.len(),
            });
        }
        Ok(Self {
            data: bytes,
            entries,
        })
    }

    fn format_name(&self) -> &'static str {
        "T64"
    }

    fn label(&self) -> String {
        field_name(&self.data[0x28..0x40])
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn directory_elements(&self) -> Result<Vec<FileEntry>, DiskError> {
        let mut entries = Vec::new();
        for index in 0..self.entries {
            if let Some(entry) = self.entry(index, entries.len())? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    fn read_file(&self, entry: &FileEntry) -> Result<Vec<u8>, DiskError> {
        let FileLocation::Offset { start, len } = entry.location else {
            return Err(DiskError::Unsupported("block entry on T64".to_string()));
        };
        let body = self
            .data
            .get(start..start + len)
            .ok_or(DiskError::Truncated {
                offset: self.data.len(),
            })?;
        let mut out = Vec::with_capacity(len + 2);
        if let Some(load) = entry.load_address {
            out.extend_from_slice(&load.to_le_bytes());
        }
        out.extend_from_slice(body);
        Ok(out)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a T64 with the given `(name, load address, body)` files.
    pub(crate) fn build_t64(label: &str, files: &[(&str, u16, &[u8])]) -> Vec<u8> {
        let mut image = vec![0u8; HEADER_SIZE + files.len() * ENTRY_SIZE];
        let signature = b"C64S tape image file";
        image[..signature.len()].copy_from_slice(signature);
        image[0x20..0x22].copy_from_slice(&0x0101u16.to_le_bytes());
        image[0x22..0x24].copy_from_slice(&(files.len() as u16).to_le_bytes());
        image[0x24..0x26].copy_from_slice(&(files.len() as u16).to_le_bytes());
        image[0x28..0x40].fill(0x20);
        image[0x28..0x28 + label.len()].copy_from_slice(label.as_bytes());

        for (i, (name, load, body)) in files.iter().enumerate() {
            let offset = image.len();
            let base = HEADER_SIZE + i * ENTRY_SIZE;
            image[base] = 1;
            image[base + 1] = 0x82;
            image[base + 2..base + 4].copy_from_slice(&load.to_le_bytes());
            let end = load + body.len() as u16;
            image[base + 4..base + 6].copy_from_slice(&end.to_le_bytes());
            image[base + 8..base + 12].copy_from_slice(&(offset as u32).to_le_bytes());
            image[base + 0x10..base + 0x20].fill(0x20);
            image[base + 0x10..base + 0x10 + name.len()].copy_from_slice(name.as_bytes());
            image.extend_from_slice(body);
        }
        image
    }

    #[test]
    fn test_parse_entries() {
        let bytes = build_t64(
            "GAMES",
            &[("ONE", 0x0801, &[1u8, 2, 3][..]), ("TWO", 0xC000, &[9u8][..])],
        );
        let tape = T64Image::mount(bytes).unwrap();
        assert_eq!(tape.label(), "GAMES");
        assert_eq!(tape.version(), 0x0101);

        let entries = tape.directory_elements().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "ONE");
        assert_eq!(entries[0].file_type, FileType::Prg);
        assert_eq!(entries[1].load_address, Some(0xC000));
        assert_eq!(tape.read_file(&entries[0]).unwrap(), vec![0x01, 0x08, 1, 2, 3]);
    }

    #[test]
    fn test_end_address_clamped_to_data() {
        let mut bytes = build_t64("T", &[("CUT", 0x0801, &[7u8; 100][..])]);
        bytes.truncate(bytes.len() - 10);
        let tape = T64Image::mount(bytes).unwrap();
        let entry = tape.directory_elements().unwrap().remove(0);
        assert_eq!(entry.location, FileLocation::Offset { start: 96, len: 90 });
        let data = tape.read_file(&entry).unwrap();
        assert_eq!(data.len(), 92);
        assert_eq!(&data[..2], &[0x01, 0x08]);

        // The classic bogus $C3C6 end address.
        let mut bytes = build_t64("T", &[("BIG", 0x0801, &[1u8, 2, 3][..])]);
        bytes[HEADER_SIZE + 4..HEADER_SIZE + 6].copy_from_slice(&0xC3C6u16.to_le_bytes());
        let tape = T64Image::mount(bytes).unwrap();
        let entry = tape.directory_elements().unwrap().remove(0);
        assert_eq!(entry.blocks, 1);
        assert_eq!(tape.read_file(&entry).unwrap(), vec![0x01, 0x08, 1, 2, 3]);
    }

    #[test]
    fn test_data_offset_past_end() {
        let mut bytes = build_t64("T", &[("GONE", 0x0801, &[1u8][..])]);
        bytes[HEADER_SIZE + 8..HEADER_SIZE + 12].copy_from_slice(&0x1000u32.to_le_bytes());
        let tape = T64Image::mount(bytes).unwrap();
        assert!(matches!(
            tape.directory_elements(),
            Err(DiskError::Truncated { .. })
        ));
    }

    #[test]
    fn test_short_header() {
        assert!(matches!(
            T64Image::mount(b"C64S tape".to_vec()),
            Err(DiskError::Truncated { .. })
        ));
    }

    #[test]
    fn test_read_only() {
        let mut tape = T64Image::mount(build_t64("T", &[])).unwrap();
        assert!(!tape.is_writable());
        assert_eq!(
            tape.write_file("X", FileType::Prg, &[]),
            Err(DiskError::WriteProtected)
        );
    }
}
