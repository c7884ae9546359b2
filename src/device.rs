//! Memory-mapped chip interface.
//!
//! Chips such as the VIC-II, SID or CIA expose a small register bank that a
//! bus implementation maps into the address space. The bus hands the chip an
//! offset relative to the chip's base address; the chip owns every side
//! effect of a register access (timer reloads, flag clearing, and so on).
//!
//! # Example
//!
//! ```rust
//! use cpu6502::Device;
//!
//! struct Latch {
//!     value: u8,
//! }
//!
//! impl Device for Latch {
//!     fn read(&self, _offset: u16) -> u8 {
//!         self.value
//!     }
//!
//!     fn write(&mut self, _offset: u16, value: u8) {
//!         self.value = value;
//!     }
//!
//!     fn size(&self) -> u16 {
//!         1
//!     }
//! }
//!
//! let mut latch = Latch { value: 0 };
//! latch.write(0, 0x42);
//! assert_eq!(latch.read(0), 0x42);
//! assert!(!latch.has_interrupt());
//! ```

/// Abstract interface for memory-mapped hardware registers.
///
/// # Design
///
/// - **Offset-based**: the device receives an offset (0 to size-1), not an
///   absolute address, so the same chip can be mapped anywhere
/// - **No panics**: offsets outside the register bank must be tolerated;
///   most chips mirror their registers through the mapped window
/// - **Shared read**: reads take `&self`; chips whose reads have side
///   effects (flag clear-on-read) keep that state in a `Cell`
pub trait Device {
    /// Read a register at `offset` from the device base address.
    fn read(&self, offset: u16) -> u8;

    /// Write a register at `offset` from the device base address.
    fn write(&mut self, offset: u16, value: u8);

    /// Size of the window the device occupies on the bus.
    fn size(&self) -> u16;

    /// Whether the device currently drives its interrupt output.
    ///
    /// The bus ORs this into the IRQ or NMI line it wires the chip to.
    fn has_interrupt(&self) -> bool {
        false
    }
}
