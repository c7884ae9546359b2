//! D64 sector image.
//!
//! A 1541 disk has 35 tracks with 17 to 21 sectors each, 683 blocks of
//! 256 bytes. Track 18 holds the BAM (sector 0) and the directory chain
//! (sectors 1 upward). Every data block starts with a link to the next
//! block; a link track of 0 marks the last block, whose link sector is the
//! index of the last valid byte.

use std::collections::HashSet;

use log::{debug, warn};

use super::handler::{DriveHandler, FileEntry, FileLocation, FileType, RelInfo};
use super::petscii::{decode_name, encode_name, SHIFTED_SPACE};
use super::DiskError;

/// Standard D64 file size (35 tracks, 683 sectors).
pub const D64_SIZE: usize = 174_848;

/// D64 with an error byte per sector appended.
pub const D64_SIZE_WITH_ERRORS: usize = 175_531;

pub const TRACKS: u8 = 35;
pub const TOTAL_BLOCKS: usize = 683;

/// Sectors per track (tracks are 1-indexed).
const SECTORS_PER_TRACK: [u8; 35] = [
    21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, // 1-17
    19, 19, 19, 19, 19, 19, 19, // 18-24
    18, 18, 18, 18, 18, 18, // 25-30
    17, 17, 17, 17, 17, // 31-35
];

/// First block number of each track.
const TRACK_OFFSETS: [usize; 35] = [
    0, 21, 42, 63, 84, 105, 126, 147, 168, 189, 210, 231, 252, 273, 294, 315, 336, // 1-17
    357, 376, 395, 414, 433, 452, 471, // 18-24
    490, 508, 526, 544, 562, 580, // 25-30
    598, 615, 632, 649, 666, // 31-35
];

pub const DIRECTORY_TRACK: u8 = 18;
pub const BAM_SECTOR: u8 = 0;
pub const DIRECTORY_FIRST_SECTOR: u8 = 1;

/// Payload bytes per block after the two link bytes.
pub const BLOCK_PAYLOAD: usize = 254;

const ENTRIES_PER_SECTOR: usize = 8;
const ENTRY_SIZE: usize = 32;
const DATA_INTERLEAVE: u8 = 10;
const DIRECTORY_INTERLEAVE: u8 = 3;

const BAM_NAME: usize = 0x90;
const BAM_ID: usize = 0xA2;
const DOS_VERSION: u8 = 0x41;

/// Type byte bits of a directory entry.
const TYPE_CLOSED: u8 = 0x80;
const TYPE_LOCKED: u8 = 0x40;

type Block = [u8; 256];

#[derive(Clone)]
pub struct D64Image {
    data: Box<[u8]>,
    modified: bool,
}

impl std::fmt::Debug for D64Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D64Image")
            .field("len", &self.data.len())
            .field("modified", &self.modified)
            .finish()
    }
}

/// Number of sectors on `track`.
pub fn sectors_in_track(track: u8) -> Result<u8, DiskError> {
    if !(1..=TRACKS).contains(&track) {
        return Err(DiskError::IllegalTrackSector { track, sector: 0 });
    }
    Ok(SECTORS_PER_TRACK[(track - 1) as usize])
}

fn block_offset(track: u8, sector: u8) -> Result<usize, DiskError> {
    let count =
        sectors_in_track(track).map_err(|_| DiskError::IllegalTrackSector { track, sector })?;
    if sector >= count {
        return Err(DiskError::IllegalTrackSector { track, sector });
    }
    Ok((TRACK_OFFSETS[(track - 1) as usize] + sector as usize) * 256)
}

/// Working copy of the BAM sector.
///
/// Allocations are planned on a copy and written back only when the whole
/// operation succeeds, so a failed write never changes the disk.
#[derive(Clone, PartialEq, Eq)]
struct Bam(Block);

impl Bam {
    fn entry(track: u8) -> usize {
        4 + (track as usize - 1) * 4
    }

    fn is_free(&self, track: u8, sector: u8) -> bool {
        let entry = Self::entry(track);
        self.0[entry + 1 + (sector / 8) as usize] & (1 << (sector % 8)) != 0
    }

    fn set_free(&mut self, track: u8, sector: u8, free: bool) -> bool {
        if self.is_free(track, sector) == free {
            return false;
        }
        let entry = Self::entry(track);
        let mask = 1 << (sector % 8);
        let byte = &mut self.0[entry + 1 + (sector / 8) as usize];
        if free {
            *byte |= mask;
            self.0[entry] = self.0[entry].saturating_add(1);
        } else {
            *byte &= !mask;
            self.0[entry] = self.0[entry].saturating_sub(1);
        }
        true
    }

    fn free_on_track(&self, track: u8) -> u8 {
        self.0[Self::entry(track)]
    }

    /// Free blocks outside the directory track.
    fn blocks_free(&self) -> u16 {
        (1..=TRACKS)
            .filter(|&t| t != DIRECTORY_TRACK)
            .map(|t| self.free_on_track(t) as u16)
            .sum()
    }

    fn mark_all(&mut self, free: bool) {
        for track in 1..=TRACKS {
            let entry = Self::entry(track);
            let count = SECTORS_PER_TRACK[(track - 1) as usize];
            self.0[entry..entry + 4].fill(0);
            if free {
                self.0[entry] = count;
                for sector in 0..count {
                    self.0[entry + 1 + (sector / 8) as usize] |= 1 << (sector % 8);
                }
            }
        }
    }

    /// First free sector on `track` at or after `start`, wrapping around.
    fn next_free_on_track(&self, track: u8, start: u8) -> Option<u8> {
        let count = SECTORS_PER_TRACK[(track - 1) as usize];
        if self.free_on_track(track) == 0 {
            return None;
        }
        let mut sector = start % count;
        for _ in 0..count {
            if self.is_free(track, sector) {
                return Some(sector);
            }
            sector = (sector + 1) % count;
        }
        None
    }

    /// Tracks ordered by distance from the directory, lower side first.
    fn track_order() -> impl Iterator<Item = u8> {
        (1..DIRECTORY_TRACK).flat_map(|d| {
            let below = DIRECTORY_TRACK - d;
            let above = DIRECTORY_TRACK + d;
            std::iter::once(below).chain((above <= TRACKS).then_some(above))
        })
    }

    /// Allocate the block that follows `(track, sector)` in a file chain.
    fn allocate_after(&mut self, previous: Option<(u8, u8)>) -> Option<(u8, u8)> {
        let (start_track, start_sector) = match previous {
            Some((track, sector)) if self.free_on_track(track) > 0 => {
                (track, sector + DATA_INTERLEAVE)
            }
            _ => {
                let track = Self::track_order().find(|&t| self.free_on_track(t) > 0)?;
                (track, 0)
            }
        };
        let sector = self.next_free_on_track(start_track, start_sector)?;
        self.set_free(start_track, sector, false);
        Some((start_track, sector))
    }

    /// Next free block at or after `(track, sector)`, for `65,NO BLOCK`.
    fn next_free_after(&self, track: u8, sector: u8) -> (u8, u8) {
        for t in track..=TRACKS {
            if t == DIRECTORY_TRACK {
                continue;
            }
            let from = if t == track { sector } else { 0 };
            for s in from..SECTORS_PER_TRACK[(t - 1) as usize] {
                if self.is_free(t, s) {
                    return (t, s);
                }
            }
        }
        (0, 0)
    }
}

impl D64Image {
    /// Wrap raw image bytes, checking the size.
    pub fn new(data: Vec<u8>) -> Result<Self, DiskError> {
        if data.len() != D64_SIZE && data.len() != D64_SIZE_WITH_ERRORS {
            return Err(DiskError::BadSize {
                format: "D64",
                got: data.len(),
            });
        }
        Ok(Self {
            data: data.into_boxed_slice(),
            modified: false,
        })
    }

    /// A freshly formatted disk.
    pub fn blank(name: &str, id: [u8; 2]) -> Self {
        let mut image = Self {
            data: vec![0; D64_SIZE].into_boxed_slice(),
            modified: false,
        };
        image.write_empty_filesystem(name, id);
        image.modified = false;
        image
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn read_sector(&self, track: u8, sector: u8) -> Result<Block, DiskError> {
        let offset = block_offset(track, sector)?;
        let mut buffer = [0u8; 256];
        buffer.copy_from_slice(&self.data[offset..offset + 256]);
        Ok(buffer)
    }

    pub fn write_sector(&mut self, track: u8, sector: u8, data: &Block) -> Result<(), DiskError> {
        let offset = block_offset(track, sector)?;
        self.data[offset..offset + 256].copy_from_slice(data);
        self.modified = true;
        Ok(())
    }

    fn bam(&self) -> Result<Bam, DiskError> {
        Ok(Bam(self.read_sector(DIRECTORY_TRACK, BAM_SECTOR)?))
    }

    fn store_bam(&mut self, bam: &Bam) -> Result<(), DiskError> {
        self.write_sector(DIRECTORY_TRACK, BAM_SECTOR, &bam.0)
    }

    pub fn disk_name(&self) -> Result<String, DiskError> {
        let bam = self.read_sector(DIRECTORY_TRACK, BAM_SECTOR)?;
        Ok(decode_name(&bam[BAM_NAME..BAM_NAME + 16]))
    }

    /// True when the block is marked free in the BAM.
    pub fn is_block_free(&self, track: u8, sector: u8) -> Result<bool, DiskError> {
        block_offset(track, sector)?;
        Ok(self.bam()?.is_free(track, sector))
    }

    /// Structural check run on mount: the BAM must link to a directory
    /// chain that stays on the disk and does not loop.
    pub fn check_structure(&self) -> Result<(), DiskError> {
        let bam = self.read_sector(DIRECTORY_TRACK, BAM_SECTOR)?;
        let (dir_track, dir_sector) = (bam[0], bam[1]);
        if dir_track == 0 {
            return Err(DiskError::Corrupt(
                "BAM has no directory pointer".to_string(),
            ));
        }
        block_offset(dir_track, dir_sector).map_err(|_| {
            DiskError::Corrupt(format!(
                "directory pointer {}/{} is off the disk",
                dir_track, dir_sector
            ))
        })?;
        if bam[2] != DOS_VERSION {
            debug!("D64 DOS version byte is ${:02X}", bam[2]);
        }
        self.directory_chain().map(|_| ())
    }

    fn directory_blocks(&self) -> Result<Vec<(u8, u8, Block)>, DiskError> {
        let bam = self.read_sector(DIRECTORY_TRACK, BAM_SECTOR)?;
        self.follow_chain(bam[0], bam[1])
    }

    /// Addresses of the directory chain, in order.
    fn directory_chain(&self) -> Result<Vec<(u8, u8)>, DiskError> {
        Ok(self
            .directory_blocks()?
            .into_iter()
            .map(|(t, s, _)| (t, s))
            .collect())
    }

    /// Walk a chain of blocks, returning each address with its contents.
    fn follow_chain(&self, track: u8, sector: u8) -> Result<Vec<(u8, u8, Block)>, DiskError> {
        let mut visited = HashSet::new();
        let mut chain = Vec::new();
        let (mut track, mut sector) = (track, sector);
        while track != 0 {
            if !visited.insert((track, sector)) {
                return Err(DiskError::Corrupt(format!(
                    "block chain loops at {}/{}",
                    track, sector
                )));
            }
            let block = self
                .read_sector(track, sector)
                .map_err(|_| DiskError::ReadError { track, sector })?;
            chain.push((track, sector, block));
            track = block[0];
            sector = block[1];
        }
        Ok(chain)
    }

    fn parse_entry(raw: &[u8], slot: usize) -> Option<FileEntry> {
        let type_byte = raw[2];
        if type_byte == 0 {
            return None;
        }
        let file_type = FileType::from_code(type_byte)?;
        let rel = (file_type == FileType::Rel).then(|| RelInfo {
            record_length: raw[23],
            side_track: raw[21],
            side_sector: raw[22],
        });
        Some(FileEntry {
            name: decode_name(&raw[5..21]),
            file_type,
            blocks: u16::from_le_bytes([raw[30], raw[31]]),
            location: FileLocation::Block {
                track: raw[3],
                sector: raw[4],
            },
            load_address: None,
            rel,
            locked: type_byte & TYPE_LOCKED != 0,
            closed: type_byte & TYPE_CLOSED != 0,
            slot,
        })
    }

    /// Locate the raw directory entry for `slot`.
    fn slot_address(&self, slot: usize) -> Result<(u8, u8, usize), DiskError> {
        let chain = self.directory_chain()?;
        let (track, sector) = chain
            .get(slot / ENTRIES_PER_SECTOR)
            .copied()
            .ok_or_else(|| DiskError::FileNotFound(format!("slot {}", slot)))?;
        Ok((track, sector, (slot % ENTRIES_PER_SECTOR) * ENTRY_SIZE))
    }

    fn update_entry<F>(&mut self, slot: usize, edit: F) -> Result<(), DiskError>
    where
        F: FnOnce(&mut [u8]),
    {
        let (track, sector, offset) = self.slot_address(slot)?;
        let mut block = self.read_sector(track, sector)?;
        edit(&mut block[offset..offset + ENTRY_SIZE]);
        self.write_sector(track, sector, &block)
    }

    /// Find a free directory slot, extending the chain on track 18 if the
    /// existing sectors are full. Returns the slot and any new sector.
    fn plan_directory_slot(&self, bam: &mut Bam) -> Result<(usize, Option<(u8, u8)>), DiskError> {
        let chain = self.directory_chain()?;
        for (index, &(track, sector)) in chain.iter().enumerate() {
            let block = self.read_sector(track, sector)?;
            for i in 0..ENTRIES_PER_SECTOR {
                if block[i * ENTRY_SIZE + 2] == 0 {
                    return Ok((index * ENTRIES_PER_SECTOR + i, None));
                }
            }
        }
        let &(last_track, last_sector) = chain.last().ok_or(DiskError::DirectoryFull)?;
        if last_track != DIRECTORY_TRACK {
            return Err(DiskError::DirectoryFull);
        }
        let sector = bam
            .next_free_on_track(DIRECTORY_TRACK, last_sector + DIRECTORY_INTERLEAVE)
            .ok_or(DiskError::DirectoryFull)?;
        bam.set_free(DIRECTORY_TRACK, sector, false);
        Ok((chain.len() * ENTRIES_PER_SECTOR, Some((DIRECTORY_TRACK, sector))))
    }

    fn write_empty_filesystem(&mut self, name: &str, id: [u8; 2]) {
        self.data.fill(0);

        let mut bam = Bam([0; 256]);
        bam.0[0] = DIRECTORY_TRACK;
        bam.0[1] = DIRECTORY_FIRST_SECTOR;
        bam.0[2] = DOS_VERSION;
        bam.mark_all(true);
        bam.set_free(DIRECTORY_TRACK, BAM_SECTOR, false);
        bam.set_free(DIRECTORY_TRACK, DIRECTORY_FIRST_SECTOR, false);
        bam.0[BAM_NAME..BAM_NAME + 16].copy_from_slice(&encode_name(name));
        bam.0[0xA0] = SHIFTED_SPACE;
        bam.0[0xA1] = SHIFTED_SPACE;
        bam.0[BAM_ID..BAM_ID + 2].copy_from_slice(&id);
        bam.0[0xA4] = SHIFTED_SPACE;
        bam.0[0xA5] = b'2';
        bam.0[0xA6] = b'A';
        bam.0[0xA7..0xAB].fill(SHIFTED_SPACE);

        let mut directory = [0u8; 256];
        directory[1] = 0xFF;

        // Both addresses are constants on the directory track.
        let bam_offset = (TRACK_OFFSETS[17] + BAM_SECTOR as usize) * 256;
        let dir_offset = (TRACK_OFFSETS[17] + DIRECTORY_FIRST_SECTOR as usize) * 256;
        self.data[bam_offset..bam_offset + 256].copy_from_slice(&bam.0);
        self.data[dir_offset..dir_offset + 256].copy_from_slice(&directory);
        self.modified = true;
    }

    /// Blocks of every reachable file chain, for validation.
    fn reachable_blocks(&self) -> Result<(Vec<(u8, u8)>, Vec<usize>), DiskError> {
        let mut used = Vec::new();
        let mut unclosed = Vec::new();
        for entry in self.directory_elements()? {
            if !entry.closed {
                unclosed.push(entry.slot);
                continue;
            }
            if let FileLocation::Block { track, sector } = entry.location {
                for (t, s, _) in self.follow_chain(track, sector)? {
                    used.push((t, s));
                }
            }
            if let Some(rel) = entry.rel {
                for (t, s, _) in self.follow_chain(rel.side_track, rel.side_sector)? {
                    used.push((t, s));
                }
            }
        }
        Ok((used, unclosed))
    }
}

impl DriveHandler for D64Image {
    fn mount(bytes: Vec<u8>) -> Result<Self, DiskError> {
        let image = Self::new(bytes)?;
        image.check_structure()?;
        Ok(image)
    }

    fn format_name(&self) -> &'static str {
        "D64"
    }

    fn label(&self) -> String {
        self.disk_name().unwrap_or_default()
    }

    fn disk_id(&self) -> [u8; 2] {
        self.read_sector(DIRECTORY_TRACK, BAM_SECTOR)
            .map(|bam| [bam[BAM_ID], bam[BAM_ID + 1]])
            .unwrap_or(*b"  ")
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn directory_elements(&self) -> Result<Vec<FileEntry>, DiskError> {
        let mut entries = Vec::new();
        for (index, (_, _, block)) in self.directory_blocks()?.into_iter().enumerate() {
            for i in 0..ENTRIES_PER_SECTOR {
                let raw = &block[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE];
                if let Some(entry) = Self::parse_entry(raw, index * ENTRIES_PER_SECTOR + i) {
                    entries.push(entry);
                }
            }
        }
        Ok(entries)
    }

    fn read_file(&self, entry: &FileEntry) -> Result<Vec<u8>, DiskError> {
        let (track, sector) = match entry.location {
            FileLocation::Block { track, sector } => (track, sector),
            FileLocation::Offset { .. } => {
                return Err(DiskError::Unsupported("offset entry on D64".to_string()))
            }
        };
        let mut data = Vec::with_capacity(entry.blocks as usize * BLOCK_PAYLOAD);
        for (_, _, block) in self.follow_chain(track, sector)? {
            if block[0] == 0 {
                let last = (block[1] as usize).max(1);
                data.extend_from_slice(&block[2..=last]);
            } else {
                data.extend_from_slice(&block[2..]);
            }
        }
        Ok(data)
    }

    fn free_blocks(&self) -> u16 {
        self.bam().map(|bam| bam.blocks_free()).unwrap_or(0)
    }

    fn is_writable(&self) -> bool {
        true
    }

    fn write_file(
        &mut self,
        name: &str,
        file_type: FileType,
        data: &[u8],
    ) -> Result<FileEntry, DiskError> {
        // Compare what the directory would hold: 16 PETSCII characters.
        let stored = decode_name(&encode_name(name));
        if self
            .directory_elements()?
            .iter()
            .any(|e| e.name.eq_ignore_ascii_case(&stored))
        {
            return Err(DiskError::FileExists(stored));
        }

        let blocks = data.len().div_ceil(BLOCK_PAYLOAD).max(1);
        let mut bam = self.bam()?;
        if (bam.blocks_free() as usize) < blocks {
            return Err(DiskError::DiskFull);
        }
        let (slot, new_dir_sector) = self.plan_directory_slot(&mut bam)?;

        let mut chain = Vec::with_capacity(blocks);
        let mut previous = None;
        for _ in 0..blocks {
            let next = bam.allocate_after(previous).ok_or(DiskError::DiskFull)?;
            chain.push(next);
            previous = Some(next);
        }

        // Everything is planned; from here on the image changes.
        let chunks: Vec<&[u8]> = if data.is_empty() {
            vec![&data[..0]]
        } else {
            data.chunks(BLOCK_PAYLOAD).collect()
        };
        for (i, (&(track, sector), chunk)) in chain.iter().zip(chunks).enumerate() {
            let mut block = [0u8; 256];
            match chain.get(i + 1) {
                Some(&(next_track, next_sector)) => {
                    block[0] = next_track;
                    block[1] = next_sector;
                }
                None => {
                    block[0] = 0;
                    block[1] = (chunk.len() + 1) as u8;
                }
            }
            block[2..2 + chunk.len()].copy_from_slice(chunk);
            self.write_sector(track, sector, &block)?;
        }

        if let Some((track, sector)) = new_dir_sector {
            let chain = self.directory_chain()?;
            if let Some(&(last_track, last_sector)) = chain.last() {
                let mut last = self.read_sector(last_track, last_sector)?;
                last[0] = track;
                last[1] = sector;
                self.write_sector(last_track, last_sector, &last)?;
            }
            let mut fresh = [0u8; 256];
            fresh[1] = 0xFF;
            self.write_sector(track, sector, &fresh)?;
        }

        let (first_track, first_sector) = chain[0];
        self.update_entry(slot, |raw| {
            raw[2..].fill(0);
            raw[2] = TYPE_CLOSED | file_type.code();
            raw[3] = first_track;
            raw[4] = first_sector;
            raw[5..21].copy_from_slice(&encode_name(name));
            raw[30..32].copy_from_slice(&(blocks as u16).to_le_bytes());
        })?;
        self.store_bam(&bam)?;
        debug!("D64: wrote {} ({} bytes, {} blocks)", name, data.len(), blocks);

        Ok(FileEntry {
            name: decode_name(&encode_name(name)),
            file_type,
            blocks: blocks as u16,
            location: FileLocation::Block {
                track: first_track,
                sector: first_sector,
            },
            load_address: None,
            rel: None,
            locked: false,
            closed: true,
            slot,
        })
    }

    fn delete_file(&mut self, entry: &FileEntry) -> Result<(), DiskError> {
        let mut bam = self.bam()?;
        if let FileLocation::Block { track, sector } = entry.location {
            match self.follow_chain(track, sector) {
                Ok(chain) => {
                    for (t, s, _) in chain {
                        bam.set_free(t, s, true);
                    }
                }
                // The entry still goes; V recovers whatever leaked.
                Err(err) => warn!("D64: freeing {}: {}", entry.name, err),
            }
        }
        if let Some(rel) = entry.rel {
            if let Ok(chain) = self.follow_chain(rel.side_track, rel.side_sector) {
                for (t, s, _) in chain {
                    bam.set_free(t, s, true);
                }
            }
        }
        self.update_entry(entry.slot, |raw| raw[2] = 0)?;
        self.store_bam(&bam)
    }

    fn rename_file(&mut self, entry: &FileEntry, new_name: &str) -> Result<(), DiskError> {
        let field = encode_name(new_name);
        self.update_entry(entry.slot, |raw| raw[5..21].copy_from_slice(&field))
    }

    fn format(&mut self, name: &str, id: Option<[u8; 2]>) -> Result<(), DiskError> {
        let id = id.unwrap_or_else(|| self.disk_id());
        self.write_empty_filesystem(name, id);
        Ok(())
    }

    fn validate(&mut self) -> Result<(), DiskError> {
        let (used, unclosed) = self.reachable_blocks()?;
        for slot in unclosed {
            self.update_entry(slot, |raw| raw[2] = 0)?;
        }

        let mut bam = self.bam()?;
        bam.mark_all(true);
        bam.set_free(DIRECTORY_TRACK, BAM_SECTOR, false);
        for (track, sector) in self.directory_chain()? {
            bam.set_free(track, sector, false);
        }
        for (track, sector) in used {
            bam.set_free(track, sector, false);
        }
        self.store_bam(&bam)
    }

    fn read_block(&self, track: u8, sector: u8) -> Result<Block, DiskError> {
        self.read_sector(track, sector)
    }

    fn write_block(&mut self, track: u8, sector: u8, data: &Block) -> Result<(), DiskError> {
        self.write_sector(track, sector, data)
    }

    fn allocate(&mut self, track: u8, sector: u8) -> Result<(), DiskError> {
        block_offset(track, sector)?;
        let mut bam = self.bam()?;
        if !bam.set_free(track, sector, false) {
            let (next_track, next_sector) = bam.next_free_after(track, sector);
            return Err(DiskError::NoBlock {
                track: next_track,
                sector: next_sector,
            });
        }
        self.store_bam(&bam)
    }

    fn free(&mut self, track: u8, sector: u8) -> Result<(), DiskError> {
        block_offset(track, sector)?;
        let mut bam = self.bam()?;
        if bam.set_free(track, sector, true) {
            self.store_bam(&bam)?;
        }
        Ok(())
    }
}
