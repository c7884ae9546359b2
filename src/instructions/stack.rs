//! # Stack Operations
//!
//! PHA, PHP, PLA and PLP.
//!
//! The 6502 stack is located at memory addresses 0x0100-0x01FF and grows downward.
//! The stack pointer (SP) is an 8-bit register that serves as an offset into this
//! page. The full stack address is calculated as 0x0100 | SP.

use crate::{ExecutionError, MemoryBus, CPU, OPCODE_TABLE};

/// Executes the PHA (Push Accumulator) instruction. 3 cycles.
///
/// # Examples
///
/// ```
/// use cpu6502::{CPU, FlatMemory, MemoryBus};
///
/// let mut memory = FlatMemory::new();
/// memory.write(0xFFFD, 0x80);
/// memory.write(0x8000, 0x48); // PHA
///
/// let mut cpu = CPU::new(memory);
/// cpu.set_a(0x42);
/// cpu.step().unwrap();
///
/// assert_eq!(cpu.memory().read(0x01FD), 0x42);
/// assert_eq!(cpu.sp(), 0xFC);
/// ```
pub(crate) fn execute_pha<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    let value = cpu.a;
    cpu.push(value);

    cpu.finish(metadata, false);
    Ok(())
}

/// Executes the PHP (Push Processor Status) instruction.
///
/// The pushed byte always has bits 4 (B) and 5 set.
pub(crate) fn execute_php<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    let status = cpu.status() | 0b0011_0000;
    cpu.push(status);

    cpu.finish(metadata, false);
    Ok(())
}

/// Executes the PLA (Pull Accumulator) instruction. Updates Z and N.
pub(crate) fn execute_pla<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    let value = cpu.pull();
    cpu.a = value;
    cpu.set_nz(value);

    cpu.finish(metadata, false);
    Ok(())
}

/// Executes the PLP (Pull Processor Status) instruction.
///
/// Bits 4 and 5 of the pulled byte are ignored.
pub(crate) fn execute_plp<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    let status = cpu.pull();
    cpu.set_status(status);

    cpu.finish(metadata, false);
    Ok(())
}
