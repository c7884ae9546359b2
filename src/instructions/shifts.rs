//! # Shift and Rotate Instructions
//!
//! ASL, LSR, ROL and ROR on the accumulator or on memory. The bit that falls
//! out goes to the carry flag; rotates shift the old carry in.

use crate::{AddressingMode, ExecutionError, MemoryBus, Mnemonic, CPU, OPCODE_TABLE};

/// Applies one shift/rotate step to `value`, updating only the carry flag.
///
/// Shared with the undocumented SLO, RLA, SRE and RRA.
pub(crate) fn shift_value<M: MemoryBus>(cpu: &mut CPU<M>, mnemonic: Mnemonic, value: u8) -> u8 {
    let carry_in = cpu.flag_c as u8;
    match mnemonic {
        Mnemonic::Asl | Mnemonic::Slo => {
            cpu.flag_c = value & 0x80 != 0;
            value << 1
        }
        Mnemonic::Lsr | Mnemonic::Sre => {
            cpu.flag_c = value & 0x01 != 0;
            value >> 1
        }
        Mnemonic::Rol | Mnemonic::Rla => {
            cpu.flag_c = value & 0x80 != 0;
            (value << 1) | carry_in
        }
        _ => {
            cpu.flag_c = value & 0x01 != 0;
            (value >> 1) | (carry_in << 7)
        }
    }
}

/// Executes ASL, LSR, ROL or ROR.
///
/// Updates C, Z and N. Memory forms never pay a page-crossing penalty;
/// their base cycles already include it.
pub(crate) fn execute_shift<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    let result = if metadata.addressing_mode == AddressingMode::Accumulator {
        let value = cpu.a;
        let result = shift_value(cpu, metadata.mnemonic, value);
        cpu.a = result;
        result
    } else {
        let (addr, _) = cpu.effective_address(metadata.addressing_mode);
        let value = cpu.memory.read(addr);
        let result = shift_value(cpu, metadata.mnemonic, value);
        cpu.memory.write(addr, result);
        result
    };
    cpu.set_nz(result);

    cpu.finish(metadata, false);
    Ok(())
}
