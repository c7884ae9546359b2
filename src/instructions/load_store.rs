//! # Load and Store Instructions
//!
//! This module implements load and store operations:
//! - LDA: Load Accumulator
//! - LDX: Load X Register
//! - LDY: Load Y Register
//! - STA, STX, STY: Store a register
//!
//! Loads pay the page-crossing penalty on indexed reads; stores never do.

use crate::{ExecutionError, MemoryBus, Mnemonic, CPU, OPCODE_TABLE};

/// Executes the LDA (Load Accumulator) instruction.
pub(crate) fn execute_lda<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let (value, page_crossed) = cpu.get_operand_value(metadata.addressing_mode);

    cpu.a = value;
    cpu.set_nz(value);

    cpu.finish(metadata, page_crossed);
    Ok(())
}

/// Executes the LDX (Load X Register) instruction.
pub(crate) fn execute_ldx<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let (value, page_crossed) = cpu.get_operand_value(metadata.addressing_mode);

    cpu.x = value;
    cpu.set_nz(value);

    cpu.finish(metadata, page_crossed);
    Ok(())
}

/// Executes the LDY (Load Y Register) instruction.
pub(crate) fn execute_ldy<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let (value, page_crossed) = cpu.get_operand_value(metadata.addressing_mode);

    cpu.y = value;
    cpu.set_nz(value);

    cpu.finish(metadata, page_crossed);
    Ok(())
}

/// Executes STA, STX or STY. No flags are affected.
pub(crate) fn execute_store<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    let value = match metadata.mnemonic {
        Mnemonic::Stx => cpu.x,
        Mnemonic::Sty => cpu.y,
        _ => cpu.a,
    };
    let (addr, _) = cpu.effective_address(metadata.addressing_mode);
    cpu.memory.write(addr, value);

    cpu.finish(metadata, false);
    Ok(())
}
