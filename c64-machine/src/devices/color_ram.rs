//! 1KB nibble-wide color RAM at $D800-$DBFF.
//!
//! Only the low four bits exist. The high nibble is left floating on the
//! real bus; reads return it as $F.

use cpu6502::Device;

use crate::state::{Persist, StateReader, StateWriter};
use crate::system::SnapshotError;

pub const COLOR_RAM_SIZE: usize = 1024;

/// Light blue, the color the KERNAL clears the screen with.
const POWER_ON_COLOR: u8 = 14;

#[derive(Debug, Clone)]
pub struct ColorRam {
    data: Box<[u8; COLOR_RAM_SIZE]>,
}

impl ColorRam {
    pub fn new() -> Self {
        Self {
            data: Box::new([POWER_ON_COLOR; COLOR_RAM_SIZE]),
        }
    }

    /// Color (0-15) of a screen cell.
    #[inline]
    pub fn get(&self, offset: usize) -> u8 {
        self.data.get(offset).copied().unwrap_or(0) & 0x0F
    }

    pub fn reset(&mut self) {
        self.data.fill(POWER_ON_COLOR);
    }
}

impl Default for ColorRam {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for ColorRam {
    fn read(&self, offset: u16) -> u8 {
        self.data[offset as usize & (COLOR_RAM_SIZE - 1)] | 0xF0
    }

    fn write(&mut self, offset: u16, value: u8) {
        self.data[offset as usize & (COLOR_RAM_SIZE - 1)] = value & 0x0F;
    }

    fn size(&self) -> u16 {
        COLOR_RAM_SIZE as u16
    }
}

impl Persist for ColorRam {
    fn save_state(&self, out: &mut StateWriter) {
        out.bytes(&self.data[..]);
    }

    fn load_state(&mut self, input: &mut StateReader<'_>) -> Result<(), SnapshotError> {
        let bytes = input.bytes(COLOR_RAM_SIZE)?;
        for (cell, &value) in self.data.iter_mut().zip(bytes) {
            *cell = value & 0x0F;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_low_nibble_is_stored() {
        let mut ram = ColorRam::new();
        ram.write(0x10, 0xA5);
        assert_eq!(ram.get(0x10), 0x05);
        assert_eq!(ram.read(0x10), 0xF5);
    }

    #[test]
    fn test_reset_restores_power_on_color() {
        let mut ram = ColorRam::new();
        ram.write(0, 2);
        ram.reset();
        assert_eq!(ram.get(0), POWER_ON_COLOR);
        assert_eq!(ram.get(COLOR_RAM_SIZE - 1), POWER_ON_COLOR);
    }
}
