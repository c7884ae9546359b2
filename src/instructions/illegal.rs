//! # Undocumented NMOS Instructions
//!
//! The stable undocumented opcodes are combinations of two documented
//! operations that the decoder activates at once:
//! - SLO, RLA, SRE, RRA: shift/rotate memory, then ORA/AND/EOR/ADC
//! - DCP, ISC: decrement/increment memory, then CMP/SBC
//! - SAX, LAX, LAS: combined register loads and stores
//! - ANC, ALR, ARR, SBX: immediate AND followed by a second operation
//!
//! ANE and LXA depend on analog effects on real silicon; the common
//! `$EE` magic constant is used. SHA, SHX, SHY and TAS store a value ANDed
//! with the high byte of the target plus one, and corrupt the target high
//! byte on a page cross.

use super::alu::{add_with_carry, compare, subtract_with_borrow};
use super::shifts::shift_value;
use crate::{AddressingMode, ExecutionError, MemoryBus, Mnemonic, CPU, OPCODE_TABLE};

const UNSTABLE_MAGIC: u8 = 0xEE;

/// Executes SLO, RLA, SRE, RRA, DCP or ISC.
pub(crate) fn execute_read_modify_combo<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let (addr, _) = cpu.effective_address(metadata.addressing_mode);
    let value = cpu.memory.read(addr);

    let modified = match metadata.mnemonic {
        Mnemonic::Dcp => value.wrapping_sub(1),
        Mnemonic::Isc => value.wrapping_add(1),
        mnemonic => shift_value(cpu, mnemonic, value),
    };
    cpu.memory.write(addr, modified);

    match metadata.mnemonic {
        Mnemonic::Slo => {
            cpu.a |= modified;
            cpu.set_nz(cpu.a);
        }
        Mnemonic::Rla => {
            cpu.a &= modified;
            cpu.set_nz(cpu.a);
        }
        Mnemonic::Sre => {
            cpu.a ^= modified;
            cpu.set_nz(cpu.a);
        }
        Mnemonic::Rra => add_with_carry(cpu, modified),
        Mnemonic::Dcp => {
            let register = cpu.a;
            compare(cpu, register, modified);
        }
        _ => subtract_with_borrow(cpu, modified),
    }

    cpu.finish(metadata, false);
    Ok(())
}

/// Executes SAX: stores A AND X. No flags are affected.
pub(crate) fn execute_sax<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let (addr, _) = cpu.effective_address(metadata.addressing_mode);

    cpu.memory.write(addr, cpu.a & cpu.x);

    cpu.finish(metadata, false);
    Ok(())
}

/// Executes LAX: loads A and X with the same value.
pub(crate) fn execute_lax<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let (value, page_crossed) = cpu.get_operand_value(metadata.addressing_mode);

    cpu.a = value;
    cpu.x = value;
    cpu.set_nz(value);

    cpu.finish(metadata, page_crossed);
    Ok(())
}

/// Executes LAS: A, X and SP all receive memory AND SP.
pub(crate) fn execute_las<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let (value, page_crossed) = cpu.get_operand_value(metadata.addressing_mode);

    let result = value & cpu.sp;
    cpu.a = result;
    cpu.x = result;
    cpu.sp = result;
    cpu.set_nz(result);

    cpu.finish(metadata, page_crossed);
    Ok(())
}

/// Executes ANC, ALR, ARR, SBX, ANE or LXA.
pub(crate) fn execute_immediate_combo<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let imm = cpu.operand_byte();

    match metadata.mnemonic {
        Mnemonic::Anc => {
            cpu.a &= imm;
            cpu.set_nz(cpu.a);
            cpu.flag_c = cpu.flag_n;
        }
        Mnemonic::Alr => {
            let anded = cpu.a & imm;
            let result = shift_value(cpu, Mnemonic::Lsr, anded);
            cpu.a = result;
            cpu.set_nz(result);
        }
        Mnemonic::Arr => arr(cpu, imm),
        Mnemonic::Sbx => {
            let anded = cpu.a & cpu.x;
            cpu.flag_c = anded >= imm;
            cpu.x = anded.wrapping_sub(imm);
            cpu.set_nz(cpu.x);
        }
        Mnemonic::Ane => {
            cpu.a = (cpu.a | UNSTABLE_MAGIC) & cpu.x & imm;
            cpu.set_nz(cpu.a);
        }
        _ => {
            let result = (cpu.a | UNSTABLE_MAGIC) & imm;
            cpu.a = result;
            cpu.x = result;
            cpu.set_nz(result);
        }
    }

    cpu.finish(metadata, false);
    Ok(())
}

/// AND then ROR, with the NMOS flag quirks and a decimal-mode fixup.
fn arr<M: MemoryBus>(cpu: &mut CPU<M>, imm: u8) {
    let anded = cpu.a & imm;
    let carry_in = cpu.flag_c as u8;
    let mut result = (anded >> 1) | (carry_in << 7);

    if !cpu.flag_d {
        cpu.set_nz(result);
        cpu.flag_c = result & 0x40 != 0;
        cpu.flag_v = ((result >> 6) ^ (result >> 5)) & 0x01 != 0;
        cpu.a = result;
        return;
    }

    cpu.flag_n = carry_in != 0;
    cpu.flag_z = result == 0;
    cpu.flag_v = (result ^ anded) & 0x40 != 0;

    if (anded & 0x0F) + (anded & 0x01) > 0x05 {
        result = (result & 0xF0) | (result.wrapping_add(0x06) & 0x0F);
    }
    if (anded as u16 & 0xF0) + (anded as u16 & 0x10) > 0x50 {
        result = result.wrapping_add(0x60);
        cpu.flag_c = true;
    } else {
        cpu.flag_c = false;
    }
    cpu.a = result;
}

/// Executes SHA, SHX, SHY or TAS.
pub(crate) fn execute_high_byte_store<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let mode = metadata.addressing_mode;

    let base = cpu.unindexed_base(mode);
    let index = if mode == AddressingMode::AbsoluteX {
        cpu.x
    } else {
        cpu.y
    };
    let mut addr = base.wrapping_add(index as u16);
    let high_plus_one = ((base >> 8) as u8).wrapping_add(1);

    let source = match metadata.mnemonic {
        Mnemonic::Shx => cpu.x,
        Mnemonic::Shy => cpu.y,
        Mnemonic::Tas => {
            cpu.sp = cpu.a & cpu.x;
            cpu.sp
        }
        _ => cpu.a & cpu.x,
    };
    let value = source & high_plus_one;

    if (addr & 0xFF00) != (base & 0xFF00) {
        addr = ((value as u16) << 8) | (addr & 0x00FF);
    }
    cpu.memory.write(addr, value);

    cpu.finish(metadata, false);
    Ok(())
}
