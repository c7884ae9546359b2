//! # Status Flag Manipulation Instructions
//!
//! CLC, SEC, CLI, SEI, CLV, CLD and SED. All use implied addressing and
//! execute in 2 cycles.

use crate::{ExecutionError, MemoryBus, Mnemonic, CPU, OPCODE_TABLE};

/// Executes one of the flag set/clear instructions.
///
/// # Examples
///
/// ```
/// use cpu6502::{CPU, FlatMemory, MemoryBus};
///
/// let mut memory = FlatMemory::new();
/// memory.write(0xFFFD, 0x80);
/// memory.write(0x8000, 0x18); // CLC
///
/// let mut cpu = CPU::new(memory);
/// cpu.set_flag_c(true);
/// cpu.step().unwrap();
///
/// assert!(!cpu.flag_c());
/// assert_eq!(cpu.cycles(), 2);
/// ```
pub(crate) fn execute_flag<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    match metadata.mnemonic {
        Mnemonic::Clc => cpu.flag_c = false,
        Mnemonic::Sec => cpu.flag_c = true,
        Mnemonic::Cli => cpu.flag_i = false,
        Mnemonic::Sei => cpu.flag_i = true,
        Mnemonic::Cld => cpu.flag_d = false,
        Mnemonic::Sed => cpu.flag_d = true,
        Mnemonic::Clv => cpu.flag_v = false,
        _ => {}
    }

    cpu.finish(metadata, false);
    Ok(())
}
