//! The assembled machine and everything that drives it.
//!
//! [`C64`] wires the CPU, memory map, chips and serial bus together and
//! runs them one instruction at a time. [`Scheduler`] moves a machine onto
//! its own thread and paces it against the wall clock; snapshots live in
//! [`snapshot`].

mod activity;
mod c64_memory;
mod joystick;
mod keyboard;
mod machine;
mod pacing;
mod resources;
mod scheduler;
pub mod snapshot;

pub use activity::ActivityTimer;
pub use c64_memory::{C64Memory, BASIC_ROM_SIZE, CHAR_ROM_SIZE, KERNAL_ROM_SIZE, RAM_SIZE};
pub use joystick::{Joysticks, JOY_DOWN, JOY_FIRE, JOY_LEFT, JOY_RIGHT, JOY_UP};
pub use keyboard::{Key, Keyboard};
pub use machine::C64;
pub use pacing::{adjust_frame_skip, Pacer, PerformanceMeter, MEASURE_INTERVAL};
pub use resources::{
    load_rom, DirectoryLoader, ResourceLoader, BASIC_ROM, CHARGEN_ROM, FLOPPY_ROM, KERNAL_ROM,
};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerState, PACE_SLICE_US};
pub use snapshot::{SnapshotError, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
