//! # Register Transfer Instructions
//!
//! TAX, TAY, TXA, TYA, TSX and TXS. All but TXS update Z and N.

use crate::{ExecutionError, MemoryBus, Mnemonic, CPU, OPCODE_TABLE};

/// Executes a register-to-register transfer.
pub(crate) fn execute_transfer<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<(), ExecutionError> {
    let metadata = &OPCODE_TABLE[opcode as usize];

    match metadata.mnemonic {
        Mnemonic::Tax => {
            cpu.x = cpu.a;
            cpu.set_nz(cpu.x);
        }
        Mnemonic::Tay => {
            cpu.y = cpu.a;
            cpu.set_nz(cpu.y);
        }
        Mnemonic::Txa => {
            cpu.a = cpu.x;
            cpu.set_nz(cpu.a);
        }
        Mnemonic::Tya => {
            cpu.a = cpu.y;
            cpu.set_nz(cpu.a);
        }
        Mnemonic::Tsx => {
            cpu.x = cpu.sp;
            cpu.set_nz(cpu.x);
        }
        // TXS leaves the flags alone
        _ => cpu.sp = cpu.x,
    }

    cpu.finish(metadata, false);
    Ok(())
}
