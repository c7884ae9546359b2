//! # Commodore 64 machine core
//!
//! The C64's custom hardware built on the `cpu6502` interpreter: VIC-II
//! video, SID sound, two 6526 CIAs, the 6510 banking port and up to four
//! high-level 1541 drives on the serial bus.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use c64_machine::{DirectoryLoader, MachineConfig, Scheduler, C64};
//!
//! let loader = DirectoryLoader::new("/usr/share/c64");
//! let machine = C64::new(MachineConfig::default(), &loader)?;
//! let scheduler = Scheduler::spawn(machine)?;
//!
//! let disk = std::fs::read("games.d64")?;
//! scheduler.attach_image(0, "games.d64", disk)?;
//! scheduler.type_text("LOAD\"*\",8,1\n")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Module Organization
//!
//! - `devices`: the chips, each a cpu6502 `Device`
//! - `disk`: image formats, drives, the command channel and the serial bus
//! - `system`: memory map, machine, scheduler thread and snapshots
//! - `events`: typed notifications for video and drive activity
//! - `config`: [`MachineConfig`], loadable from JSON
//!
//! The crate logs through the `log` facade and never installs a logger.

pub mod config;
pub mod devices;
pub mod disk;
pub mod error;
pub mod events;
mod state;
pub mod system;

pub use config::{FrameSkip, IllegalOpcodes, MachineConfig, Region};
pub use devices::{Cia6526, ColorRam, FrameGeometry, Port6510, Sid6581, VicII};
pub use disk::{DiskError, Drive, DriveHandler, DriveStatus, IecBus};
pub use error::{MachineError, Result};
pub use events::{AudioSink, DriveActivity, DriveEvent, VideoEvent};
pub use system::{
    C64Memory, DirectoryLoader, Key, Keyboard, ResourceLoader, Scheduler, SchedulerHandle,
    SchedulerState, SnapshotError, C64,
};
