//! C64 memory system with bank switching.
//!
//! The 6510 I/O port ($00-$01) decides which ROMs, RAM and I/O chips are
//! visible; the decision is taken again on every access.
//!
//! Memory Map:
//! - $0000-$0001: 6510 I/O port
//! - $0002-$9FFF: RAM (always)
//! - $A000-$BFFF: BASIC ROM or RAM
//! - $C000-$CFFF: RAM (always)
//! - $D000-$DFFF: I/O, Character ROM, or RAM
//! - $E000-$FFFF: KERNAL ROM or RAM
//!
//! Writes to a ROM area always land in the RAM underneath.

use cpu6502::{Device, MemoryBus};

use super::joystick::Joysticks;
use super::keyboard::Keyboard;
use super::resources::{BASIC_ROM, CHARGEN_ROM, KERNAL_ROM};
use crate::config::Region;
use crate::devices::{Cia6526, ColorRam, Port6510, PortPins, Sid6581, VicII, VideoMemory};
use crate::error::{MachineError, Result};
use crate::state::{Persist, StateReader, StateWriter};
use crate::system::SnapshotError;

pub const RAM_SIZE: usize = 0x10000;
pub const BASIC_ROM_SIZE: usize = 8192;
pub const KERNAL_ROM_SIZE: usize = 8192;
pub const CHAR_ROM_SIZE: usize = 4096;

const BASIC_START: u16 = 0xA000;
const IO_START: u16 = 0xD000;
const KERNAL_START: u16 = 0xE000;

pub struct C64Memory {
    ram: Box<[u8; RAM_SIZE]>,
    basic_rom: Box<[u8; BASIC_ROM_SIZE]>,
    kernal_rom: Box<[u8; KERNAL_ROM_SIZE]>,
    char_rom: Box<[u8; CHAR_ROM_SIZE]>,

    pub port: Port6510,
    pub vic: VicII,
    pub sid: Sid6581,
    /// Keyboard, joysticks, IRQ.
    pub cia1: Cia6526,
    /// Serial bus, VIC bank, NMI.
    pub cia2: Cia6526,
    pub color_ram: ColorRam,

    pub keyboard: Keyboard,
    pub joysticks: Joysticks,
}

/// The VIC's view: 16KB bank from CIA #2, character ROM at $1000-$1FFF of
/// banks 0 and 2, never BASIC, KERNAL or I/O.
struct VicView<'a> {
    ram: &'a [u8; RAM_SIZE],
    char_rom: &'a [u8; CHAR_ROM_SIZE],
    color_ram: &'a ColorRam,
    bank: u16,
}

impl VideoMemory for VicView<'_> {
    fn fetch(&self, addr: u16) -> u8 {
        let addr = addr & 0x3FFF;
        if self.bank & 1 == 0 && (0x1000..0x2000).contains(&addr) {
            return self.char_rom[(addr & 0x0FFF) as usize];
        }
        self.ram[((self.bank << 14) | addr) as usize]
    }

    fn color(&self, offset: usize) -> u8 {
        self.color_ram.get(offset)
    }
}

impl C64Memory {
    /// Empty ROMs; call [`load_roms`](Self::load_roms) before running code.
    pub fn new(region: Region) -> Self {
        let mut cia1 = Cia6526::new(region.clock_hz());
        cia1.set_boot_read_threshold(u32::MAX);

        Self {
            ram: Box::new([0; RAM_SIZE]),
            basic_rom: Box::new([0; BASIC_ROM_SIZE]),
            kernal_rom: Box::new([0; KERNAL_ROM_SIZE]),
            char_rom: Box::new([0; CHAR_ROM_SIZE]),
            port: Port6510::new(),
            vic: VicII::new(region),
            sid: Sid6581::new(region.clock_hz()),
            cia1,
            cia2: Cia6526::new(region.clock_hz()),
            color_ram: ColorRam::new(),
            keyboard: Keyboard::new(),
            joysticks: Joysticks::new(),
        }
    }

    /// Installs the three system ROMs; sizes must match exactly.
    pub fn load_roms(&mut self, basic: &[u8], kernal: &[u8], chargen: &[u8]) -> Result<()> {
        check_rom_size(BASIC_ROM, basic, BASIC_ROM_SIZE)?;
        check_rom_size(KERNAL_ROM, kernal, KERNAL_ROM_SIZE)?;
        check_rom_size(CHARGEN_ROM, chargen, CHAR_ROM_SIZE)?;

        self.basic_rom.copy_from_slice(basic);
        self.kernal_rom.copy_from_slice(kernal);
        self.char_rom.copy_from_slice(chargen);
        Ok(())
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram[..]
    }

    pub fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram[..]
    }

    /// True when the CPU currently sees KERNAL ROM at $E000.
    pub fn kernal_visible(&self) -> bool {
        self.port.kernal_visible()
    }

    /// A byte as the VIC would fetch it.
    pub fn vic_read(&self, addr: u16) -> u8 {
        self.vic_view().fetch(addr)
    }

    fn vic_view(&self) -> VicView<'_> {
        VicView {
            ram: &self.ram,
            char_rom: &self.char_rom,
            color_ram: &self.color_ram,
            bank: self.cia2.vic_bank() as u16,
        }
    }

    /// Runs every chip for `cycles` CPU cycles.
    pub fn advance(&mut self, cycles: u32) {
        let view = VicView {
            ram: &self.ram,
            char_rom: &self.char_rom,
            color_ram: &self.color_ram,
            bank: self.cia2.vic_bank() as u16,
        };
        self.vic.advance(cycles, &view);
        self.sid.advance(cycles);
        self.cia1.advance(cycles);
        self.cia2.advance(cycles);
    }

    /// External levels on CIA #1: keyboard matrix and both joysticks, all
    /// active low and wired-AND.
    fn cia1_pins(&self) -> PortPins {
        let pa_out = self.cia1.port_a.drive() & self.joysticks.port2_pins();
        let pb_out = self.cia1.port_b.drive() & self.joysticks.port1_pins();
        PortPins {
            a: self.keyboard.scan_port_a(pb_out) & self.joysticks.port2_pins(),
            b: self.keyboard.scan_port_b(pa_out) & self.joysticks.port1_pins(),
        }
    }

    /// Power-on chips. RAM keeps its contents, as on a real reset line;
    /// ROMs, frame-skip and boot threshold stay too.
    pub fn reset(&mut self) {
        self.port.reset();
        self.vic.reset();
        self.sid.reset();
        self.cia1.reset();
        self.cia2.reset();
        self.color_ram.reset();
        self.keyboard.release_all();
        self.joysticks.release_all();
    }

    fn io_read(&self, addr: u16) -> u8 {
        match addr {
            0xD000..=0xD3FF => self.vic.read(addr & 0x3F),
            0xD400..=0xD7FF => self.sid.read(addr & 0x1F),
            0xD800..=0xDBFF => self.color_ram.read(addr - 0xD800),
            0xDC00..=0xDCFF => self.cia1.read_with_pins(addr & 0x0F, self.cia1_pins()),
            0xDD00..=0xDDFF => self.cia2.read(addr & 0x0F),
            // Expansion port: nothing attached
            _ => 0xFF,
        }
    }

    fn io_write(&mut self, addr: u16, value: u8) {
        match addr {
            0xD000..=0xD3FF => self.vic.write(addr & 0x3F, value),
            0xD400..=0xD7FF => self.sid.write(addr & 0x1F, value),
            0xD800..=0xDBFF => self.color_ram.write(addr - 0xD800, value),
            0xDC00..=0xDCFF => self.cia1.write(addr & 0x0F, value),
            0xDD00..=0xDDFF => self.cia2.write(addr & 0x0F, value),
            _ => {}
        }
    }
}

fn check_rom_size(name: &str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() != expected {
        return Err(MachineError::RomSize {
            name: name.to_string(),
            expected,
            got: data.len(),
        });
    }
    Ok(())
}

impl MemoryBus for C64Memory {
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x0001 => self.port.read(addr),
            BASIC_START..=0xBFFF if self.port.basic_visible() => {
                self.basic_rom[(addr - BASIC_START) as usize]
            }
            IO_START..=0xDFFF if self.port.io_visible() => self.io_read(addr),
            IO_START..=0xDFFF if self.port.char_rom_visible() => {
                self.char_rom[(addr - IO_START) as usize]
            }
            KERNAL_START..=0xFFFF if self.port.kernal_visible() => {
                self.kernal_rom[(addr - KERNAL_START) as usize]
            }
            _ => self.ram[addr as usize],
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x0001 => {
                self.port.write(addr, value);
                self.ram[addr as usize] = value;
            }
            IO_START..=0xDFFF if self.port.io_visible() => self.io_write(addr, value),
            _ => self.ram[addr as usize] = value,
        }
    }

    fn irq_active(&self) -> bool {
        self.cia1.has_interrupt() || self.vic.has_interrupt()
    }

    fn nmi_active(&self) -> bool {
        self.cia2.has_interrupt() || self.keyboard.restore_pressed()
    }
}

impl Persist for C64Memory {
    fn save_state(&self, out: &mut StateWriter) {
        out.bytes(&self.ram[..]);
        self.port.save_state(out);
        self.vic.save_state(out);
        self.sid.save_state(out);
        self.cia1.save_state(out);
        self.cia2.save_state(out);
        self.color_ram.save_state(out);
    }

    /// Decodes into scratch copies and commits only when everything parsed.
    fn load_state(&mut self, input: &mut StateReader<'_>) -> std::result::Result<(), SnapshotError> {
        let ram: [u8; RAM_SIZE] = input.array()?;
        let mut port = self.port.clone();
        let mut vic = self.vic.clone();
        let mut sid = self.sid.clone();
        let mut cia1 = self.cia1.clone();
        let mut cia2 = self.cia2.clone();
        let mut color_ram = self.color_ram.clone();

        port.load_state(input)?;
        vic.load_state(input)?;
        sid.load_state(input)?;
        cia1.load_state(input)?;
        cia2.load_state(input)?;
        color_ram.load_state(input)?;

        self.ram.copy_from_slice(&ram);
        self.port = port;
        self.vic = vic;
        self.sid = sid;
        self.cia1 = cia1;
        self.cia2 = cia2;
        self.color_ram = color_ram;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::keyboard::Key;
    use crate::system::joystick::{JOY_FIRE, JOY_UP};

    fn memory_with_roms() -> C64Memory {
        let mut mem = C64Memory::new(Region::PAL);
        mem.load_roms(&[0xAA; 8192], &[0xBB; 8192], &[0xCC; 4096])
            .unwrap();
        mem
    }

    #[test]
    fn test_port_power_on() {
        let mem = C64Memory::new(Region::PAL);
        assert_eq!(mem.read(0x00), 0x2F);
        assert_eq!(mem.read(0x01), 0x37);
    }

    #[test]
    fn test_rom_size_is_checked() {
        let mut mem = C64Memory::new(Region::PAL);
        let err = mem
            .load_roms(&[0; 100], &[0; 8192], &[0; 4096])
            .unwrap_err();
        assert!(matches!(
            err,
            MachineError::RomSize {
                expected: 8192,
                got: 100,
                ..
            }
        ));
        assert!(mem.load_roms(&[0; 8192], &[0; 8192], &[0; 100]).is_err());
    }

    #[test]
    fn test_bank_switching() {
        let mut mem = memory_with_roms();

        assert_eq!(mem.read(0xA000), 0xAA);
        assert_eq!(mem.read(0xE000), 0xBB);

        mem.write(0xA000, 0x55);
        assert_eq!(mem.read(0xA000), 0xAA);

        mem.write(0x01, 0x30);
        assert_eq!(mem.read(0xA000), 0x55);
        assert_eq!(mem.read(0xE000), 0x00);
    }

    #[test]
    fn test_char_rom_and_io_selection() {
        let mut mem = memory_with_roms();
        mem.write(0xD020, 0x05);
        assert_eq!(mem.vic.border_color(), 0x05);

        mem.write(0x01, 0x33);
        assert_eq!(mem.read(0xD000), 0xCC);

        // RAM under the character ROM takes the write
        mem.write(0xD000, 0x12);
        mem.write(0x01, 0x34);
        assert_eq!(mem.read(0xD000), 0x12);
    }

    #[test]
    fn test_sid_and_color_ram_decoded() {
        let mut mem = C64Memory::new(Region::PAL);
        mem.write(0xD418, 0x0F);
        assert_eq!(mem.sid.volume(), 0x0F);
        mem.write(0xD800, 0x03);
        assert_eq!(mem.read(0xD800) & 0x0F, 0x03);
    }

    #[test]
    fn test_keyboard_scan_through_cia1() {
        let mut mem = C64Memory::new(Region::PAL);
        mem.write(0xDC02, 0xFF);
        mem.write(0xDC03, 0x00);

        mem.write(0xDC00, 0x00);
        assert_eq!(mem.read(0xDC01), 0xFF);

        // A is PA1/PB2
        mem.keyboard.press(Key::A);
        mem.write(0xDC00, 0xFD);
        assert_eq!(mem.read(0xDC01), 0xFB);
        mem.write(0xDC00, 0xFE);
        assert_eq!(mem.read(0xDC01), 0xFF);

        mem.keyboard.release(Key::A);
        mem.write(0xDC00, 0xFD);
        assert_eq!(mem.read(0xDC01), 0xFF);
    }

    #[test]
    fn test_joysticks_through_cia1() {
        let mut mem = C64Memory::new(Region::PAL);
        mem.write(0xDC02, 0x00);
        mem.write(0xDC03, 0x00);

        mem.joysticks.set(2, JOY_UP);
        assert_eq!(mem.read(0xDC00) & 0x1F, 0x1E);
        mem.joysticks.set(1, JOY_FIRE);
        assert_eq!(mem.read(0xDC01) & 0x1F, 0x0F);
    }

    #[test]
    fn test_vic_sees_char_rom_shadow() {
        let mut mem = memory_with_roms();
        mem.ram_mut()[0x1000] = 0x11;
        mem.ram_mut()[0x5000] = 0x22;
        assert_eq!(mem.vic_read(0x1000), 0xCC);

        // Bank 1 ($4000-$7FFF): plain RAM
        mem.write(0xDD02, 0x03);
        mem.write(0xDD00, 0x02);
        assert_eq!(mem.vic_read(0x1000), 0x22);
    }

    #[test]
    fn test_interrupt_lines() {
        let mut mem = C64Memory::new(Region::PAL);
        assert!(!mem.irq_active());
        assert!(!mem.nmi_active());

        mem.keyboard.press(Key::Restore);
        assert!(mem.nmi_active());
        mem.keyboard.release(Key::Restore);

        // CIA #2 timer A, one-shot, NMI enabled
        mem.write(0xDD04, 0x02);
        mem.write(0xDD05, 0x00);
        mem.write(0xDD0D, 0x81);
        mem.write(0xDD0E, 0x19);
        mem.advance(4);
        assert!(mem.nmi_active());
        assert!(!mem.irq_active());
    }

    #[test]
    fn test_state_round_trip() {
        let mut mem = memory_with_roms();
        mem.write(0x0400, 0x01);
        mem.write(0xD020, 0x02);
        mem.write(0x01, 0x36);

        let mut out = StateWriter::new();
        mem.save_state(&mut out);
        let data = out.into_inner();

        let mut restored = memory_with_roms();
        restored.load_state(&mut StateReader::new(&data)).unwrap();
        assert_eq!(restored.read(0x0400), 0x01);
        assert_eq!(restored.vic.border_color(), 0x02);
        assert!(!restored.port.basic_visible());
    }

    #[test]
    fn test_truncated_state_changes_nothing() {
        let mut mem = memory_with_roms();
        mem.write(0x0400, 0x77);

        let mut out = StateWriter::new();
        C64Memory::new(Region::PAL).save_state(&mut out);
        let mut data = out.into_inner();
        data.truncate(data.len() - 1);

        assert!(mem.load_state(&mut StateReader::new(&data)).is_err());
        assert_eq!(mem.read(0x0400), 0x77);
    }
}
