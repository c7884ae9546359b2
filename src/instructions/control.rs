//! # Control Flow Instructions
//!
//! This module implements control flow operations:
//! - BRK: Force Interrupt
//! - JMP: Jump to address
//! - JSR/RTS: Subroutine call and return
//! - RTI: Return from interrupt
//! - NOP: No operation (documented and undocumented forms)
//!
//! It also hosts the hardware interrupt entry sequence used for IRQ and NMI,
//! which differs from BRK only in the pushed return address and the B bit.

use crate::cpu::IRQ_VECTOR;
use crate::{ExecutionError, MemoryBus, CPU, OPCODE_TABLE};

/// Bit 4 of a pushed status byte: set for BRK/PHP, clear for IRQ/NMI.
const BREAK_BIT: u8 = 0b0001_0000;

/// Performs the 7-cycle hardware interrupt entry.
///
/// Pushes PC (high, low) and status with B clear, sets I and loads PC from
/// `vector`.
pub(crate) fn enter_interrupt<M: MemoryBus>(cpu: &mut CPU<M>, vector: u16) {
    let return_address = cpu.pc;
    cpu.push_word(return_address);
    let status = cpu.status() & !BREAK_BIT;
    cpu.push(status);
    cpu.flag_i = true;
    cpu.pc = cpu.read_word(vector);
    cpu.cycles += crate::cpu::INTERRUPT_CYCLES as u64;
}

/// Executes the BRK (Force Interrupt) instruction.
///
/// BRK pushes PC+2 (the byte after BRK is a padding byte), then the status
/// with B set, sets I and vectors through $FFFE/$FFFF. 7 cycles.
pub(crate) fn execute_brk<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    let return_address = cpu.pc.wrapping_add(2);
    cpu.push_word(return_address);
    let status = cpu.status() | BREAK_BIT;
    cpu.push(status);

    cpu.flag_i = true;
    cpu.pc = cpu.read_word(IRQ_VECTOR);
    cpu.cycles += metadata.base_cycles as u64;

    Ok(())
}

/// Executes the JMP (Jump) instruction.
///
/// Absolute (0x4C, 3 cycles) or Indirect (0x6C, 5 cycles). The indirect
/// form reproduces the NMOS page-wrap bug.
pub(crate) fn execute_jmp<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    let (target, _) = cpu.effective_address(metadata.addressing_mode);
    cpu.pc = target;
    cpu.cycles += metadata.base_cycles as u64;

    Ok(())
}

/// Executes the JSR (Jump to Subroutine) instruction.
///
/// Pushes the address of the last byte of the JSR (PC+2) and jumps.
pub(crate) fn execute_jsr<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    let target = cpu.operand_word();
    let return_address = cpu.pc.wrapping_add(2);
    cpu.push_word(return_address);

    cpu.pc = target;
    cpu.cycles += metadata.base_cycles as u64;

    Ok(())
}

/// Executes the RTS (Return from Subroutine) instruction.
pub(crate) fn execute_rts<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    let return_address = cpu.pull_word();
    cpu.pc = return_address.wrapping_add(1);
    cpu.cycles += metadata.base_cycles as u64;

    Ok(())
}

/// Executes the RTI (Return from Interrupt) instruction.
///
/// Pulls status (ignoring B and bit 5) then PC. Unlike RTS, the pulled PC
/// is used as-is.
pub(crate) fn execute_rti<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    let status = cpu.pull();
    cpu.set_status(status);
    cpu.pc = cpu.pull_word();
    cpu.cycles += metadata.base_cycles as u64;

    Ok(())
}

/// Executes NOP.
///
/// The undocumented forms still perform their operand read, so an indexed
/// read that crosses a page pays the extra cycle.
pub(crate) fn execute_nop<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    let (_, page_crossed) = cpu.effective_address(metadata.addressing_mode);
    cpu.finish(metadata, page_crossed);

    Ok(())
}
