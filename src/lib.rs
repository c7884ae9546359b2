//! # 6502/6510 CPU Interpreter
//!
//! A cycle-counted NMOS 6502 interpreter used as the processor core of the
//! C64 machine crate (the 6510 is a 6502 with an on-chip I/O port, which the
//! machine models as memory at $0000/$0001).
//!
//! The crate provides CPU state, a trait-based memory bus, a table-driven
//! opcode description and the instruction implementations, including
//! decimal-mode arithmetic and the undocumented NMOS opcodes.
//!
//! ## Quick Start
//!
//! ```rust
//! use cpu6502::{CPU, FlatMemory, MemoryBus};
//!
//! // Create 64KB flat memory
//! let mut memory = FlatMemory::new();
//!
//! // Set reset vector to point to program start at 0x8000
//! memory.write(0xFFFC, 0x00); // Low byte
//! memory.write(0xFFFD, 0x80); // High byte
//! memory.write(0x8000, 0xEA); // NOP
//!
//! let mut cpu = CPU::new(memory);
//! assert_eq!(cpu.pc(), 0x8000);
//!
//! let cycles = cpu.execute_one().unwrap();
//! assert_eq!(cycles, 2);
//! assert_eq!(cpu.pc(), 0x8001);
//! ```
//!
//! ## Interrupts
//!
//! The bus exposes two lines: IRQ (level sensitive, masked by the I flag)
//! and NMI (edge triggered). Both are sampled exactly once per call to
//! [`CPU::execute_one`], before the next opcode fetch, so an interrupt that
//! asserts in the middle of an instruction is seen at the following
//! instruction boundary.
//!
//! ## Modules
//!
//! - `cpu` - CPU state and execution logic
//! - `memory` - MemoryBus trait and the flat RAM implementation
//! - `device` - Device trait for memory-mapped chips
//! - `opcodes` - Opcode metadata table
//! - `addressing` - Addressing mode enumeration

pub mod addressing;
pub mod cpu;
pub mod device;
pub mod memory;
pub mod opcodes;

// Internal instruction implementations (not part of public API)
mod instructions;

// Re-export public API
pub use addressing::AddressingMode;
pub use cpu::{CpuState, IllegalOpcodePolicy, CPU};
pub use device::Device;
pub use memory::{FlatMemory, MemoryBus};
pub use opcodes::{Mnemonic, OpcodeMetadata, OPCODE_TABLE};

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// An undocumented opcode was fetched while the CPU runs with
    /// [`IllegalOpcodePolicy::Fatal`].
    #[error("illegal opcode 0x{opcode:02X} at ${pc:04X}")]
    IllegalOpcode {
        /// The offending opcode byte.
        opcode: u8,
        /// Address the opcode was fetched from.
        pc: u16,
    },

    /// A KIL/JAM opcode halted the processor. Only a reset recovers.
    #[error("CPU jammed by opcode 0x{opcode:02X} at ${pc:04X}")]
    Jammed {
        /// The jamming opcode byte.
        opcode: u8,
        /// Address the opcode was fetched from.
        pc: u16,
    },
}
