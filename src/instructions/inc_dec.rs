//! # Increment and Decrement Instructions
//!
//! INC/DEC operate on memory (read-modify-write); INX, INY, DEX and DEY on
//! the index registers. All wrap at 8 bits and update Z and N.

use crate::{ExecutionError, MemoryBus, Mnemonic, CPU, OPCODE_TABLE};

/// Executes the INC (Increment Memory) instruction.
pub(crate) fn execute_inc<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    let (addr, _) = cpu.effective_address(metadata.addressing_mode);
    let result = cpu.memory.read(addr).wrapping_add(1);
    cpu.memory.write(addr, result);
    cpu.set_nz(result);

    cpu.finish(metadata, false);
    Ok(())
}

/// Executes the DEC (Decrement Memory) instruction.
pub(crate) fn execute_dec<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    let (addr, _) = cpu.effective_address(metadata.addressing_mode);
    let result = cpu.memory.read(addr).wrapping_sub(1);
    cpu.memory.write(addr, result);
    cpu.set_nz(result);

    cpu.finish(metadata, false);
    Ok(())
}

/// Executes INX, INY, DEX or DEY.
pub(crate) fn execute_index_step<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    let result = match metadata.mnemonic {
        Mnemonic::Inx => {
            cpu.x = cpu.x.wrapping_add(1);
            cpu.x
        }
        Mnemonic::Iny => {
            cpu.y = cpu.y.wrapping_add(1);
            cpu.y
        }
        Mnemonic::Dex => {
            cpu.x = cpu.x.wrapping_sub(1);
            cpu.x
        }
        _ => {
            cpu.y = cpu.y.wrapping_sub(1);
            cpu.y
        }
    };
    cpu.set_nz(result);

    cpu.finish(metadata, false);
    Ok(())
}
