//! # Branch Instructions
//!
//! BCC, BCS, BEQ, BNE, BMI, BPL, BVC and BVS share one implementation; the
//! dispatcher evaluates the condition and passes it in.
//!
//! All branch instructions use relative addressing with a signed 8-bit offset.
//! Cycle timing:
//! - 2 cycles if branch not taken
//! - 3 cycles if branch taken to same page
//! - 4 cycles if branch taken to different page

use crate::{ExecutionError, MemoryBus, CPU, OPCODE_TABLE};

/// Executes a conditional branch.
///
/// No flags are affected.
pub(crate) fn execute_branch<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
    taken: bool,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let offset = cpu.operand_byte() as i8;

    let mut cycles = metadata.base_cycles as u64;
    let pc_after_instruction = cpu.pc.wrapping_add(metadata.size_bytes as u16);

    if taken {
        let target_pc = pc_after_instruction.wrapping_add_signed(offset as i16);

        cycles += 1;
        if (pc_after_instruction & 0xFF00) != (target_pc & 0xFF00) {
            cycles += 1;
        }

        cpu.pc = target_pc;
    } else {
        cpu.pc = pc_after_instruction;
    }

    cpu.cycles += cycles;

    Ok(())
}
