//! # ALU (Arithmetic Logic Unit) Instructions
//!
//! This module implements arithmetic and logical operations:
//! - ADC/SBC: Add/Subtract with Carry, in binary or decimal (BCD) mode
//! - AND, ORA, EOR: Bitwise logic on the accumulator
//! - CMP, CPX, CPY: Register comparison
//! - BIT: Bit test
//!
//! Decimal mode follows the NMOS 6502: the accumulator and carry receive the
//! BCD-corrected result, Z reflects the binary sum, and N/V are taken from
//! the intermediate value after the low-nibble correction.

use crate::{ExecutionError, MemoryBus, CPU, OPCODE_TABLE};

/// Adds `value` plus carry to the accumulator, honoring the D flag.
///
/// Shared by ADC and the undocumented RRA.
pub(crate) fn add_with_carry<M: MemoryBus>(cpu: &mut CPU<M>, value: u8) {
    let a = cpu.a;
    let carry_in = cpu.flag_c as u16;
    let binary = a as u16 + value as u16 + carry_in;

    if !cpu.flag_d {
        let result = binary as u8;
        cpu.flag_c = binary > 0xFF;
        // Overflow: both operands share a sign the result does not have
        cpu.flag_v = ((a ^ result) & (value ^ result) & 0x80) != 0;
        cpu.set_nz(result);
        cpu.a = result;
        return;
    }

    let mut lo = (a & 0x0F) as u16 + (value & 0x0F) as u16 + carry_in;
    if lo > 0x09 {
        lo += 0x06;
    }
    let mut tmp = (lo & 0x0F) + (a & 0xF0) as u16 + (value & 0xF0) as u16;
    if lo > 0x0F {
        tmp += 0x10;
    }

    cpu.flag_z = (binary & 0xFF) == 0;
    cpu.flag_n = (tmp & 0x80) != 0;
    cpu.flag_v = ((a as u16 ^ tmp) & 0x80) != 0 && ((a ^ value) & 0x80) == 0;

    if (tmp & 0x1F0) > 0x90 {
        tmp += 0x60;
    }
    cpu.flag_c = (tmp & 0xFF0) > 0xF0;
    cpu.a = tmp as u8;
}

/// Subtracts `value` and the borrow (inverted carry) from the accumulator,
/// honoring the D flag.
///
/// Shared by SBC and the undocumented ISC and SBC #$EB.
pub(crate) fn subtract_with_borrow<M: MemoryBus>(cpu: &mut CPU<M>, value: u8) {
    let a = cpu.a;
    let borrow = (!cpu.flag_c) as i32;
    let binary = a as i32 - value as i32 - borrow;
    let result = binary as u8;

    // Flags always come from the binary difference on NMOS parts
    cpu.flag_c = binary >= 0;
    cpu.flag_v = ((a ^ result) & (a ^ value) & 0x80) != 0;
    cpu.set_nz(result);

    if !cpu.flag_d {
        cpu.a = result;
        return;
    }

    let mut lo = (a & 0x0F) as i32 - (value & 0x0F) as i32 - borrow;
    let mut tmp = if lo & 0x10 != 0 {
        lo = (lo - 0x06) & 0x0F;
        lo | ((a & 0xF0) as i32 - (value & 0xF0) as i32 - 0x10)
    } else {
        (lo & 0x0F) | ((a & 0xF0) as i32 - (value & 0xF0) as i32)
    };
    if tmp & 0x100 != 0 {
        tmp -= 0x60;
    }
    cpu.a = tmp as u8;
}

/// Sets C, Z and N as for `register - value`.
pub(crate) fn compare<M: MemoryBus>(cpu: &mut CPU<M>, register: u8, value: u8) {
    cpu.flag_c = register >= value;
    cpu.set_nz(register.wrapping_sub(value));
}

/// Executes the ADC (Add with Carry) instruction.
pub(crate) fn execute_adc<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let (value, page_crossed) = cpu.get_operand_value(metadata.addressing_mode);

    add_with_carry(cpu, value);

    cpu.finish(metadata, page_crossed);
    Ok(())
}

/// Executes the SBC (Subtract with Carry) instruction.
///
/// Also serves the undocumented immediate alias $EB.
pub(crate) fn execute_sbc<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let (value, page_crossed) = cpu.get_operand_value(metadata.addressing_mode);

    subtract_with_borrow(cpu, value);

    cpu.finish(metadata, page_crossed);
    Ok(())
}

/// Executes the AND (Logical AND) instruction.
pub(crate) fn execute_and<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let (value, page_crossed) = cpu.get_operand_value(metadata.addressing_mode);

    let result = cpu.a & value;
    cpu.a = result;
    cpu.set_nz(result);

    cpu.finish(metadata, page_crossed);
    Ok(())
}

/// Executes the ORA (Logical Inclusive OR) instruction.
pub(crate) fn execute_ora<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let (value, page_crossed) = cpu.get_operand_value(metadata.addressing_mode);

    let result = cpu.a | value;
    cpu.a = result;
    cpu.set_nz(result);

    cpu.finish(metadata, page_crossed);
    Ok(())
}

/// Executes the EOR (Exclusive OR) instruction.
pub(crate) fn execute_eor<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let (value, page_crossed) = cpu.get_operand_value(metadata.addressing_mode);

    let result = cpu.a ^ value;
    cpu.a = result;
    cpu.set_nz(result);

    cpu.finish(metadata, page_crossed);
    Ok(())
}

/// Executes the CMP (Compare Accumulator) instruction.
pub(crate) fn execute_cmp<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let (value, page_crossed) = cpu.get_operand_value(metadata.addressing_mode);

    let register = cpu.a;
    compare(cpu, register, value);

    cpu.finish(metadata, page_crossed);
    Ok(())
}

/// Executes the CPX (Compare X Register) instruction.
pub(crate) fn execute_cpx<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let (value, page_crossed) = cpu.get_operand_value(metadata.addressing_mode);

    let register = cpu.x;
    compare(cpu, register, value);

    cpu.finish(metadata, page_crossed);
    Ok(())
}

/// Executes the CPY (Compare Y Register) instruction.
pub(crate) fn execute_cpy<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let (value, page_crossed) = cpu.get_operand_value(metadata.addressing_mode);

    let register = cpu.y;
    compare(cpu, register, value);

    cpu.finish(metadata, page_crossed);
    Ok(())
}

/// Executes the BIT (Bit Test) instruction.
///
/// Z is set from A AND M; N and V are copied from bits 7 and 6 of M.
pub(crate) fn execute_bit<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];
    let (value, page_crossed) = cpu.get_operand_value(metadata.addressing_mode);

    cpu.flag_z = (cpu.a & value) == 0;
    cpu.flag_n = (value & 0x80) != 0;
    cpu.flag_v = (value & 0x40) != 0;

    cpu.finish(metadata, page_crossed);
    Ok(())
}
