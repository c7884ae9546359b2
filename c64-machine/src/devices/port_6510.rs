//! 6510 on-chip I/O port at $00/$01.
//!
//! - $00: Data Direction Register (0 = input, 1 = output per bit)
//! - $01: Data Register
//!
//! Bits 0-2 of the effective port value select the memory configuration:
//! - Bit 0 (LORAM): BASIC ROM at $A000-$BFFF (together with HIRAM)
//! - Bit 1 (HIRAM): KERNAL ROM at $E000-$FFFF
//! - Bit 2 (CHAREN): 0 = Character ROM, 1 = I/O at $D000-$DFFF
//!
//! Inputs are pulled up, so a bit switched to input reads as 1 and keeps
//! the ROMs banked in.

use cpu6502::Device;

use crate::state::{Persist, StateReader, StateWriter};
use crate::system::SnapshotError;

/// Levels seen on input pins: bits 0-2 pulled high, cassette sense (bit 4)
/// high while no key on the datasette is pressed.
const PULL_UPS: u8 = 0x17;

#[derive(Debug, Clone)]
pub struct Port6510 {
    ddr: u8,
    data: u8,
    external: u8,
}

impl Port6510 {
    /// Power-on state: DDR $2F, data $37 (BASIC, I/O and KERNAL visible).
    pub fn new() -> Self {
        Self {
            ddr: 0x2F,
            data: 0x37,
            external: PULL_UPS,
        }
    }

    /// Memory configuration 0-7.
    ///
    /// | Value | $A000-$BFFF | $D000-$DFFF | $E000-$FFFF |
    /// |-------|-------------|-------------|-------------|
    /// | 0, 4  | RAM         | RAM         | RAM         |
    /// | 1     | RAM         | CHAR ROM    | RAM         |
    /// | 2     | RAM         | CHAR ROM    | KERNAL      |
    /// | 3     | BASIC       | CHAR ROM    | KERNAL      |
    /// | 5     | RAM         | I/O         | RAM         |
    /// | 6     | RAM         | I/O         | KERNAL      |
    /// | 7     | BASIC       | I/O         | KERNAL      |
    #[inline]
    pub fn bank_config(&self) -> u8 {
        self.effective_data() & 0x07
    }

    #[inline]
    pub fn basic_visible(&self) -> bool {
        self.effective_data() & 0x03 == 0x03
    }

    #[inline]
    pub fn kernal_visible(&self) -> bool {
        self.effective_data() & 0x02 != 0
    }

    #[inline]
    pub fn io_visible(&self) -> bool {
        matches!(self.bank_config(), 5..=7)
    }

    #[inline]
    pub fn char_rom_visible(&self) -> bool {
        matches!(self.bank_config(), 1..=3)
    }

    /// Output bits come from the data register, input bits from the pins.
    #[inline]
    fn effective_data(&self) -> u8 {
        (self.data & self.ddr) | (self.external & !self.ddr)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Port6510 {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Port6510 {
    fn read(&self, offset: u16) -> u8 {
        match offset & 0x01 {
            0 => self.ddr,
            _ => self.effective_data(),
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        match offset & 0x01 {
            0 => self.ddr = value,
            _ => self.data = value,
        }
    }

    fn size(&self) -> u16 {
        2
    }
}

impl Persist for Port6510 {
    fn save_state(&self, out: &mut StateWriter) {
        out.u8(self.ddr);
        out.u8(self.data);
    }

    fn load_state(&mut self, input: &mut StateReader<'_>) -> Result<(), SnapshotError> {
        self.ddr = input.u8()?;
        self.data = input.u8()?;
        Ok(())
    }
}
