//! Presents a tape-style image as a disk.
//!
//! The first directory, file or block access copies every file of the
//! wrapped image into an in-memory D64. From then on the drive sees an
//! ordinary sector image, so block commands and directory listings work
//! the same for every format. The wrapped image stays the source of truth
//! for [`DriveHandler::bytes`], and the adapter is write protected.

use std::cell::OnceCell;

use log::{debug, warn};

use super::d64::D64Image;
use super::handler::{DriveHandler, FileEntry};
use super::DiskError;

pub struct TapeAdapter<H> {
    inner: H,
    disk: OnceCell<D64Image>,
}

impl<H: DriveHandler> TapeAdapter<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            disk: OnceCell::new(),
        }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn is_materialized(&self) -> bool {
        self.disk.get().is_some()
    }

    fn materialize(&self) -> Result<D64Image, DiskError> {
        let mut label = self.inner.label();
        label.truncate(16);
        let mut disk = D64Image::blank(&label, *b"T1");
        for entry in self.inner.directory_elements()? {
            let data = match self.inner.read_file(&entry) {
                Ok(data) => data,
                Err(err) => {
                    warn!("{}: skipping {}: {}", self.inner.format_name(), entry.name, err);
                    continue;
                }
            };
            match disk.write_file(&entry.name, entry.file_type, &data) {
                Ok(_) => {}
                Err(DiskError::FileExists(name)) => {
                    warn!("{}: duplicate file {}", self.inner.format_name(), name);
                }
                Err(err) => return Err(err),
            }
        }
        debug!(
            "{}: materialized {} files as D64",
            self.inner.format_name(),
            disk.directory_elements()?.len()
        );
        Ok(disk)
    }

    fn disk(&self) -> Result<&D64Image, DiskError> {
        if let Some(disk) = self.disk.get() {
            return Ok(disk);
        }
        let disk = self.materialize()?;
        Ok(self.disk.get_or_init(|| disk))
    }
}

impl<H: DriveHandler> DriveHandler for TapeAdapter<H> {
    fn mount(bytes: Vec<u8>) -> Result<Self, DiskError> {
        H::mount(bytes).map(Self::new)
    }

    fn format_name(&self) -> &'static str {
        self.inner.format_name()
    }

    fn label(&self) -> String {
        self.inner.label()
    }

    fn disk_id(&self) -> [u8; 2] {
        self.disk().map(|d| d.disk_id()).unwrap_or(*b"  ")
    }

    fn bytes(&self) -> &[u8] {
        self.inner.bytes()
    }

    fn directory_elements(&self) -> Result<Vec<FileEntry>, DiskError> {
        self.disk()?.directory_elements()
    }

    fn read_file(&self, entry: &FileEntry) -> Result<Vec<u8>, DiskError> {
        self.disk()?.read_file(entry)
    }

    fn free_blocks(&self) -> u16 {
        self.disk().map(|d| d.free_blocks()).unwrap_or(0)
    }

    fn read_block(&self, track: u8, sector: u8) -> Result<[u8; 256], DiskError> {
        self.disk()?.read_block(track, sector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::handler::{FileLocation, FileType};
    use crate::disk::p00::tests::build_p00;
    use crate::disk::p00::P00Image;
    use crate::disk::t64::tests::build_t64;
    use crate::disk::t64::T64Image;

    #[test]
    fn test_materializes_on_first_use() {
        let bytes = build_t64(
            "TAPE",
            &[("FIRST", 0x0801, &[1u8, 2, 3][..]), ("SECOND", 0xC000, &[0u8; 600][..])],
        );
        let adapter = TapeAdapter::<T64Image>::mount(bytes.clone()).unwrap();
        assert!(!adapter.is_materialized());
        assert_eq!(adapter.label(), "TAPE");

        let entries = adapter.directory_elements().unwrap();
        assert!(adapter.is_materialized());
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0].location, FileLocation::Block { .. }));
        assert_eq!(entries[1].blocks, 3);
        assert_eq!(
            adapter.read_file(&entries[0]).unwrap(),
            vec![0x01, 0x08, 1, 2, 3]
        );
        assert_eq!(adapter.bytes(), &bytes[..]);
        assert_eq!(adapter.free_blocks(), 664 - 4);
    }

    #[test]
    fn test_block_reads_hit_the_synthetic_disk() {
        let adapter = TapeAdapter::new(P00Image::mount(build_p00("GAME", &[1, 8, 0x60])).unwrap());
        let bam = adapter.read_block(18, 0).unwrap();
        assert_eq!(&bam[0x90..0x94], b"GAME");
    }

    #[test]
    fn test_truncated_file_is_skipped() {
        let mut bytes = build_t64(
            "T",
            &[("GOOD", 0x0801, &[1u8][..]), ("BAD", 0x0801, &[0u8; 50][..])],
        );
        bytes.truncate(bytes.len() - 5);
        let adapter = TapeAdapter::<T64Image>::mount(bytes).unwrap();
        let names: Vec<String> = adapter
            .directory_elements()
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["GOOD".to_string()]);
    }

    #[test]
    fn test_write_protected() {
        let mut adapter =
            TapeAdapter::new(P00Image::mount(build_p00("GAME", &[1, 8])).unwrap());
        assert_eq!(
            adapter.write_file("NEW", FileType::Prg, &[1, 8]),
            Err(DiskError::WriteProtected)
        );
        let entry = adapter.directory_elements().unwrap().remove(0);
        assert_eq!(adapter.delete_file(&entry), Err(DiskError::WriteProtected));
    }
}
