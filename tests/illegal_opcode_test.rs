//! Tests for the undocumented NMOS opcodes and the illegal-opcode policy.

use cpu6502::{ExecutionError, FlatMemory, IllegalOpcodePolicy, MemoryBus, CPU, OPCODE_TABLE};

fn setup_cpu(program: &[u8]) -> CPU<FlatMemory> {
    let mut memory = FlatMemory::new();
    memory.write(0xFFFC, 0x00);
    memory.write(0xFFFD, 0x80);
    memory.load(0x8000, program);
    CPU::new(memory)
}

// ========== Combined load/store ==========

#[test]
fn test_lax_loads_a_and_x() {
    let mut cpu = setup_cpu(&[0xA7, 0x10]); // LAX $10
    cpu.memory_mut().write(0x0010, 0x80);

    assert_eq!(cpu.execute_one().unwrap(), 3);
    assert_eq!(cpu.a(), 0x80);
    assert_eq!(cpu.x(), 0x80);
    assert!(cpu.flag_n());
}

#[test]
fn test_sax_stores_a_and_x() {
    let mut cpu = setup_cpu(&[0x87, 0x20]); // SAX $20
    cpu.set_a(0xF0);
    cpu.set_x(0x3C);

    cpu.step().unwrap();
    assert_eq!(cpu.memory().read(0x0020), 0x30);
}

// ========== Read-modify-write combos ==========

#[test]
fn test_dcp_decrements_then_compares() {
    let mut cpu = setup_cpu(&[0xC7, 0x30]); // DCP $30
    cpu.memory_mut().write(0x0030, 0x43);
    cpu.set_a(0x42);

    assert_eq!(cpu.execute_one().unwrap(), 5);
    assert_eq!(cpu.memory().read(0x0030), 0x42);
    assert!(cpu.flag_z());
    assert!(cpu.flag_c());
}

#[test]
fn test_isc_increments_then_subtracts() {
    let mut cpu = setup_cpu(&[0xE7, 0x40]); // ISC $40
    cpu.memory_mut().write(0x0040, 0x0F);
    cpu.set_a(0x20);
    cpu.set_flag_c(true);

    cpu.step().unwrap();
    assert_eq!(cpu.memory().read(0x0040), 0x10);
    assert_eq!(cpu.a(), 0x10);
    assert!(cpu.flag_c());
}

#[test]
fn test_slo_shifts_then_ors() {
    let mut cpu = setup_cpu(&[0x07, 0x50]); // SLO $50
    cpu.memory_mut().write(0x0050, 0x81);
    cpu.set_a(0x01);

    cpu.step().unwrap();
    assert_eq!(cpu.memory().read(0x0050), 0x02);
    assert_eq!(cpu.a(), 0x03);
    assert!(cpu.flag_c());
}

#[test]
fn test_rra_rotates_then_adds() {
    let mut cpu = setup_cpu(&[0x67, 0x60]); // RRA $60
    cpu.memory_mut().write(0x0060, 0x02);
    cpu.set_a(0x01);
    cpu.set_flag_c(true);

    cpu.step().unwrap();
    assert_eq!(cpu.memory().read(0x0060), 0x81);
    assert_eq!(cpu.a(), 0x82);
    assert!(!cpu.flag_c());
}

#[test]
fn test_read_modify_combo_has_no_page_penalty() {
    let mut cpu = setup_cpu(&[0x1F, 0xFF, 0x20]); // SLO $20FF,X
    cpu.set_x(1);

    assert_eq!(cpu.execute_one().unwrap(), 7);
}

// ========== Immediate combos ==========

#[test]
fn test_anc_copies_n_into_c() {
    let mut cpu = setup_cpu(&[0x0B, 0x80]);
    cpu.set_a(0xFF);

    cpu.step().unwrap();
    assert_eq!(cpu.a(), 0x80);
    assert!(cpu.flag_n());
    assert!(cpu.flag_c());
}

#[test]
fn test_alr_ands_then_shifts_right() {
    let mut cpu = setup_cpu(&[0x4B, 0x03]);
    cpu.set_a(0xFF);

    cpu.step().unwrap();
    assert_eq!(cpu.a(), 0x01);
    assert!(cpu.flag_c());
}

#[test]
fn test_arr_binary_flags() {
    let mut cpu = setup_cpu(&[0x6B, 0xFF]);
    cpu.set_a(0xFF);
    cpu.set_flag_c(true);

    cpu.step().unwrap();
    assert_eq!(cpu.a(), 0xFF);
    assert!(cpu.flag_c());
    assert!(!cpu.flag_v());
    assert!(cpu.flag_n());
}

#[test]
fn test_sbx_subtracts_from_a_and_x() {
    let mut cpu = setup_cpu(&[0xCB, 0x02]);
    cpu.set_a(0x0F);
    cpu.set_x(0x07);

    cpu.step().unwrap();
    assert_eq!(cpu.x(), 0x05);
    assert!(cpu.flag_c());
    assert_eq!(cpu.a(), 0x0F);
}

#[test]
fn test_sbc_immediate_alias() {
    let mut cpu = setup_cpu(&[0xEB, 0x01]);
    cpu.set_a(0x05);
    cpu.set_flag_c(true);

    cpu.step().unwrap();
    assert_eq!(cpu.a(), 0x04);
}

// ========== High-byte stores ==========

#[test]
fn test_shx_masks_with_high_byte_plus_one() {
    let mut cpu = setup_cpu(&[0x9E, 0x00, 0x10]); // SHX $1000,Y
    cpu.set_x(0xFF);
    cpu.set_y(0x01);

    cpu.step().unwrap();
    assert_eq!(cpu.memory().read(0x1001), 0x11);
}

#[test]
fn test_tas_sets_stack_pointer() {
    let mut cpu = setup_cpu(&[0x9B, 0x00, 0x30]); // TAS $3000,Y
    cpu.set_a(0xF3);
    cpu.set_x(0x3F);

    cpu.step().unwrap();
    assert_eq!(cpu.sp(), 0x33);
    assert_eq!(cpu.memory().read(0x3000), 0x31);
}

// ========== NOPs and JAM ==========

#[test]
fn test_undocumented_nop_absolute_x_pays_penalty() {
    let mut cpu = setup_cpu(&[0x1C, 0xFF, 0x10]);
    cpu.set_x(1);

    assert_eq!(cpu.execute_one().unwrap(), 5);
    assert_eq!(cpu.pc(), 0x8003);
}

#[test]
fn test_jam_halts_until_reset() {
    let mut cpu = setup_cpu(&[0xEA, 0x02]);

    cpu.step().unwrap();
    assert_eq!(
        cpu.step(),
        Err(ExecutionError::Jammed {
            opcode: 0x02,
            pc: 0x8001
        })
    );
    let cycles = cpu.cycles();
    assert!(cpu.step().is_err());
    assert_eq!(cpu.cycles(), cycles, "jammed CPU does not advance");

    cpu.reset();
    cpu.step().unwrap();
    assert_eq!(cpu.pc(), 0x8001);
}

// ========== Fatal policy ==========

#[test]
fn test_fatal_policy_rejects_every_undocumented_opcode() {
    for (opcode, metadata) in OPCODE_TABLE.iter().enumerate() {
        if metadata.documented {
            continue;
        }
        let mut cpu = setup_cpu(&[opcode as u8, 0x00, 0x00]);
        cpu.set_illegal_opcode_policy(IllegalOpcodePolicy::Fatal);
        let before = cpu.state();

        let result = cpu.step();
        assert_eq!(
            result,
            Err(ExecutionError::IllegalOpcode {
                opcode: opcode as u8,
                pc: 0x8000
            })
        );
        assert_eq!(cpu.state(), before, "opcode 0x{:02X} changed state", opcode);
    }
}

#[test]
fn test_fatal_policy_still_runs_documented_opcodes() {
    let mut cpu = setup_cpu(&[0xA9, 0x01]);
    cpu.set_illegal_opcode_policy(IllegalOpcodePolicy::Fatal);

    cpu.step().unwrap();
    assert_eq!(cpu.a(), 0x01);
}
