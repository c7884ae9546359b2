//! # Memory Bus Abstraction
//!
//! The `MemoryBus` trait decouples the CPU from the machine it sits in. A
//! bus decides what lives at each address (RAM, ROM, chip registers) and
//! reports the state of the two interrupt lines.
//!
//! ## Design Principles
//!
//! The MemoryBus trait follows 6502 hardware behavior:
//! - No bus errors - reads/writes always succeed
//! - Unmapped reads may return garbage
//! - Writes to ROM/unmapped regions may be ignored
//! - Interrupt lines are polled, never pushed into the CPU

/// Memory bus trait for CPU to read/write bytes.
///
/// # Design
///
/// - `read(&self)`: Immutable reference allows shared reads
/// - `write(&mut self)`: Mutable reference makes side effects explicit
/// - No error types: 6502 hardware has no bus error mechanism
///
/// # Examples
///
/// ```
/// use cpu6502::{MemoryBus, FlatMemory};
///
/// let mut mem = FlatMemory::new();
/// mem.write(0x1234, 0x42);
/// assert_eq!(mem.read(0x1234), 0x42);
/// ```
///
/// ## Implementing Custom Memory
///
/// ```
/// use cpu6502::MemoryBus;
///
/// struct RomRamMemory {
///     ram: [u8; 0x8000],
///     rom: [u8; 0x8000],
/// }
///
/// impl MemoryBus for RomRamMemory {
///     fn read(&self, addr: u16) -> u8 {
///         if addr < 0x8000 {
///             self.ram[addr as usize]
///         } else {
///             self.rom[(addr - 0x8000) as usize]
///         }
///     }
///
///     fn write(&mut self, addr: u16, value: u8) {
///         if addr < 0x8000 {
///             self.ram[addr as usize] = value;
///         }
///         // Writes to ROM are silently ignored
///     }
/// }
/// ```
pub trait MemoryBus {
    /// Reads a byte from the specified 16-bit address.
    ///
    /// This method must never panic. If the address is unmapped,
    /// implementations may return garbage data (matching 6502 hardware).
    fn read(&self, addr: u16) -> u8;

    /// Writes a byte to the specified 16-bit address.
    ///
    /// This method must never panic. Writes to read-only or unmapped
    /// addresses may be ignored.
    fn write(&mut self, addr: u16, value: u8);

    /// Checks if the IRQ (Interrupt Request) line is active.
    ///
    /// # Hardware Semantics
    ///
    /// The IRQ line is **level-sensitive** and **shared**: it is active while
    /// ANY source asserts it and stays active until ALL sources are cleared.
    /// The CPU samples it once per instruction and ignores it while the I
    /// flag is set.
    ///
    /// The default implementation reports no interrupt.
    fn irq_active(&self) -> bool {
        false
    }

    /// Checks if the NMI (Non-Maskable Interrupt) line is active.
    ///
    /// NMI is **edge-triggered**: the CPU services it once on each
    /// inactive-to-active transition, regardless of the I flag. Holding the
    /// line active does not cause repeated interrupts.
    fn nmi_active(&self) -> bool {
        false
    }
}

/// Simple 64KB flat memory implementation.
///
/// All 65536 addresses are writable RAM initialized to 0x00. The two
/// interrupt lines can be driven directly, which makes this the bus of choice
/// for exercising interrupt timing in isolation.
///
/// # Examples
///
/// ```
/// use cpu6502::{CPU, FlatMemory, MemoryBus};
///
/// let mut memory = FlatMemory::new();
/// memory.write(0xFFFC, 0x00);
/// memory.write(0xFFFD, 0x80);
///
/// let cpu = CPU::new(memory);
/// assert_eq!(cpu.pc(), 0x8000);
/// ```
pub struct FlatMemory {
    /// 64KB contiguous memory array
    data: Box<[u8; 65536]>,
    irq_line: bool,
    nmi_line: bool,
}

impl FlatMemory {
    /// Creates a new FlatMemory instance with all bytes initialized to zero.
    pub fn new() -> Self {
        Self {
            data: Box::new([0; 65536]),
            irq_line: false,
            nmi_line: false,
        }
    }

    /// Copies `bytes` into memory starting at `addr`, wrapping at $FFFF.
    pub fn load(&mut self, addr: u16, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            self.data[addr.wrapping_add(i as u16) as usize] = b;
        }
    }

    /// Drives the IRQ line.
    pub fn set_irq(&mut self, active: bool) {
        self.irq_line = active;
    }

    /// Drives the NMI line.
    pub fn set_nmi(&mut self, active: bool) {
        self.nmi_line = active;
    }
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus for FlatMemory {
    fn read(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.data[addr as usize] = value;
    }

    fn irq_active(&self) -> bool {
        self.irq_line
    }

    fn nmi_active(&self) -> bool {
        self.nmi_line
    }
}
