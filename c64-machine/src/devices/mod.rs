//! C64 chips implementing the cpu6502 `Device` trait.
//!
//! - [`VicII`]: MOS 6569/6567 video chip (graphics, sprites, raster IRQ)
//! - [`Sid6581`]: MOS 6581 sound chip
//! - [`Cia6526`]: MOS 6526 timers, ports and time-of-day clock
//! - [`Port6510`]: 6510 on-chip port (memory banking)
//! - [`ColorRam`]: 1KB nibble RAM read by the VIC-II
//!
//! Chips hold no listeners. Events and audio samples queue up inside the
//! chip until the machine drains them.

mod cia;
mod color_ram;
mod port_6510;
pub mod sid;
pub mod vic_ii;

pub use cia::{Cia6526, CiaPort, CiaTimer, PortPins, TodClock};
pub use color_ram::ColorRam;
pub use port_6510::Port6510;
pub use sid::{Sid6581, BITS_PER_SAMPLE, CHANNELS, SAMPLE_RATE};
pub use vic_ii::{FrameGeometry, VicII, VideoMemory, FRAME_HEIGHT, FRAME_WIDTH, PALETTE};
