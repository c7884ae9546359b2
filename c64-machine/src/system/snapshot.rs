//! Whole-machine snapshots.
//!
//! ## Binary format
//!
//! - 1 byte: number of attached images
//! - per image: drive index (1 byte), file name (u16 LE length + UTF-8)
//! - 4 bytes: magic `C64S`
//! - 4 bytes: version (u32 LE)
//! - 1 byte: region (0 PAL, 1 NTSC)
//! - CPU registers, cycle counter and interrupt latch
//! - per image: u32 LE length + delta against the image file
//! - RAM, 6510 port, VIC-II, SID, CIA #1, CIA #2, color RAM
//!
//! The image list comes first so a loader can fetch the files before it
//! decodes the rest. Images are stored by name only; their modifications
//! travel as deltas.
//!
//! Restoring is all-or-nothing: images are re-attached to a scratch bus
//! and the chips are decoded into scratch copies, and the running machine
//! is only touched once everything succeeded.

use cpu6502::CpuState;
use log::{info, warn};
use thiserror::Error;

use super::machine::C64;
use super::resources::ResourceLoader;
use crate::config::Region;
use crate::disk::IecBus;
use crate::error::Result;
use crate::state::{Persist, StateReader, StateWriter};

pub const SNAPSHOT_MAGIC: [u8; 4] = *b"C64S";
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("not a snapshot: bad magic")]
    BadMagic,
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
    #[error("snapshot data ends early at offset {offset}")]
    Truncated { offset: usize },
    #[error("invalid UTF-8 string at offset {offset}")]
    BadString { offset: usize },
    #[error("snapshot was taken on a {0:?} machine")]
    RegionMismatch(Region),
    #[error("snapshot uses drive {0}, which this machine does not have")]
    NoSuchDrive(u8),
    #[error("cannot re-attach {name}: {reason}")]
    ImageReattach { name: String, reason: String },
}

fn region_code(region: Region) -> u8 {
    match region {
        Region::PAL => 0,
        Region::NTSC => 1,
    }
}

fn write_cpu(out: &mut StateWriter, cpu: &CpuState) {
    out.u8(cpu.a);
    out.u8(cpu.x);
    out.u8(cpu.y);
    out.u8(cpu.sp);
    out.u16(cpu.pc);
    out.u8(cpu.status);
    out.u64(cpu.cycles);
    out.bool(cpu.jammed.is_some());
    out.u8(cpu.jammed.unwrap_or(0));
    out.bool(cpu.nmi_line);
}

fn read_cpu(input: &mut StateReader<'_>) -> std::result::Result<CpuState, SnapshotError> {
    let a = input.u8()?;
    let x = input.u8()?;
    let y = input.u8()?;
    let sp = input.u8()?;
    let pc = input.u16()?;
    let status = input.u8()?;
    let cycles = input.u64()?;
    let jammed = input.bool()?;
    let opcode = input.u8()?;
    let nmi_line = input.bool()?;
    Ok(CpuState {
        a,
        x,
        y,
        sp,
        pc,
        status,
        cycles,
        jammed: jammed.then_some(opcode),
        nmi_line,
    })
}

impl C64 {
    /// Serializes the machine. Attached images are recorded by name plus a
    /// delta of their changes.
    pub fn save_snapshot(&self) -> Result<Vec<u8>> {
        let mut images = Vec::new();
        for drive in self.bus.drives() {
            if let (Some(name), Some(delta)) = (drive.image_name(), drive.create_delta()?) {
                images.push((drive.index(), name, delta));
            }
        }

        let mut out = StateWriter::new();
        out.u8(images.len() as u8);
        for (index, name, _) in &images {
            out.u8(*index);
            out.string(name);
        }
        out.bytes(&SNAPSHOT_MAGIC);
        out.u32(SNAPSHOT_VERSION);
        out.u8(region_code(self.config.region));
        write_cpu(&mut out, &self.cpu.state());
        for (_, _, delta) in &images {
            out.u32(delta.len() as u32);
            out.bytes(delta);
        }
        self.cpu.memory().save_state(&mut out);

        let data = out.into_inner();
        info!(
            "snapshot written: {} bytes, {} image(s)",
            data.len(),
            images.len()
        );
        Ok(data)
    }

    /// Restores a snapshot, fetching attached images through `images`. On
    /// any failure the machine keeps running in its previous state.
    pub fn restore_snapshot(&mut self, data: &[u8], images: &dyn ResourceLoader) -> Result<()> {
        match self.decode_snapshot(data, images) {
            Ok(()) => {
                info!("snapshot restored at PC ${:04X}", self.cpu.pc());
                Ok(())
            }
            Err(err) => {
                warn!("snapshot restore failed, state unchanged: {}", err);
                Err(err.into())
            }
        }
    }

    fn decode_snapshot(
        &mut self,
        data: &[u8],
        loader: &dyn ResourceLoader,
    ) -> std::result::Result<(), SnapshotError> {
        let mut input = StateReader::new(data);

        let count = input.u8()?;
        let mut images = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let drive = input.u8()?;
            let name = input.string()?;
            images.push((drive, name));
        }
        if input.bytes(4)? != SNAPSHOT_MAGIC {
            return Err(SnapshotError::BadMagic);
        }
        let version = input.u32()?;
        if version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(version));
        }
        let region = input.u8()?;
        if region != region_code(self.config.region) {
            let theirs = if region == 0 { Region::PAL } else { Region::NTSC };
            return Err(SnapshotError::RegionMismatch(theirs));
        }
        let cpu = read_cpu(&mut input)?;

        let mut bus = IecBus::new(self.config.drive_count);
        for (drive, name) in images {
            let len = input.u32()? as usize;
            let delta = input.bytes(len)?;
            let reattach = |reason: String| SnapshotError::ImageReattach {
                name: name.clone(),
                reason,
            };
            let bytes = loader.load(&name).map_err(|e| reattach(e.to_string()))?;
            bus.drive_mut(drive)
                .ok_or(SnapshotError::NoSuchDrive(drive))?
                .attach_with_delta(&name, bytes, delta)
                .map_err(|e| reattach(e.to_string()))?;
        }

        // Last fallible step; it commits only when every chip decoded.
        self.cpu.memory_mut().load_state(&mut input)?;

        self.cpu.restore_state(&cpu);
        self.replace_bus(bus);
        Ok(())
    }
}
