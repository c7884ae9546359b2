//! # CPU State and Execution
//!
//! This module contains the CPU struct representing the 6502 processor state and
//! the fetch-decode-execute loop.
//!
//! ## CPU State
//!
//! The CPU maintains:
//! - **Registers**: Accumulator (A), index registers (X, Y)
//! - **Program counter** (PC): 16-bit address of next instruction
//! - **Stack pointer** (SP): 8-bit offset into stack page (0x0100-0x01FF)
//! - **Status flags**: N, V, D, I, Z, C (individual bool fields). The B flag
//!   only exists in status bytes pushed to the stack.
//! - **Cycle counter**: u64 monotonically increasing cycle count
//!
//! ## Execution Model
//!
//! - `execute_one()`: service a pending interrupt or execute one instruction,
//!   returning the cycles consumed
//! - `step()`: same as `execute_one()` without the cycle count
//! - `run_for_cycles()`: execute until a cycle budget is exhausted
//!
//! Interrupt lines are sampled once per `execute_one()`, at the instruction
//! boundary before the opcode fetch. NMI has priority over IRQ.

use crate::instructions::{
    alu, branches, control, flags, illegal, inc_dec, load_store, shifts, stack, transfer,
};
use crate::{AddressingMode, ExecutionError, MemoryBus, Mnemonic, OpcodeMetadata, OPCODE_TABLE};

/// NMI vector address.
pub const NMI_VECTOR: u16 = 0xFFFA;
/// Reset vector address.
pub const RESET_VECTOR: u16 = 0xFFFC;
/// IRQ/BRK vector address.
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Cycles taken by the hardware interrupt entry sequence.
pub const INTERRUPT_CYCLES: u8 = 7;

/// What the interpreter does when it fetches an undocumented opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IllegalOpcodePolicy {
    /// Execute the NMOS behavior. KIL opcodes jam the processor.
    #[default]
    Execute,
    /// Stop with [`ExecutionError::IllegalOpcode`] without touching state.
    Fatal,
}

/// Register file snapshot used for save states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuState {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    /// Packed NV-BDIZC status byte (bit 5 set, B clear).
    pub status: u8,
    pub cycles: u64,
    /// Opcode that jammed the CPU, if any.
    pub jammed: Option<u8>,
    /// NMI line level seen at the last instruction boundary.
    pub nmi_line: bool,
}

/// 6502 CPU state and execution context.
///
/// The CPU struct contains all processor state including registers, flags, program counter,
/// stack pointer, and cycle counter. It is generic over the memory implementation via the
/// `MemoryBus` trait.
///
/// # Examples
///
/// ```
/// use cpu6502::{CPU, FlatMemory, MemoryBus};
///
/// let mut memory = FlatMemory::new();
/// memory.write(0xFFFC, 0x00);
/// memory.write(0xFFFD, 0x80); // PC = 0x8000
///
/// let cpu = CPU::new(memory);
///
/// assert_eq!(cpu.pc(), 0x8000);
/// assert_eq!(cpu.sp(), 0xFD);
/// assert!(cpu.flag_i());
/// assert_eq!(cpu.cycles(), 0);
/// ```
pub struct CPU<M: MemoryBus> {
    /// Accumulator register
    pub(crate) a: u8,

    /// X index register
    pub(crate) x: u8,

    /// Y index register
    pub(crate) y: u8,

    /// Program counter (address of next instruction)
    pub(crate) pc: u16,

    /// Stack pointer (0x0100 + sp gives full stack address)
    pub(crate) sp: u8,

    /// Negative flag (set if bit 7 of result is 1)
    pub(crate) flag_n: bool,

    /// Overflow flag (set on signed overflow)
    pub(crate) flag_v: bool,

    /// Decimal mode flag (enables BCD arithmetic)
    pub(crate) flag_d: bool,

    /// Interrupt disable flag (blocks IRQ when set)
    pub(crate) flag_i: bool,

    /// Zero flag (set if result is zero)
    pub(crate) flag_z: bool,

    /// Carry flag (set on unsigned overflow/underflow)
    pub(crate) flag_c: bool,

    /// Total CPU cycles executed
    pub(crate) cycles: u64,

    /// Memory bus implementation
    pub(crate) memory: M,

    policy: IllegalOpcodePolicy,

    /// Set by KIL; cleared only by reset.
    jammed: Option<u8>,

    /// NMI level at the previous boundary, for edge detection.
    nmi_line: bool,
}

impl<M: MemoryBus> CPU<M> {
    /// Creates a new CPU with the given memory bus.
    ///
    /// The CPU is initialized to the 6502 power-on reset state:
    /// - PC is loaded from the reset vector at 0xFFFC/0xFFFD (little-endian)
    /// - SP is set to 0xFD
    /// - Interrupt Disable flag is set
    /// - A, X, Y are zeroed and the cycle counter starts at 0
    pub fn new(memory: M) -> Self {
        let pc = read_vector(&memory, RESET_VECTOR);

        Self {
            a: 0x00,
            x: 0x00,
            y: 0x00,
            pc,
            sp: 0xFD,
            flag_n: false,
            flag_v: false,
            flag_d: false,
            flag_i: true, // Interrupt disable set on reset
            flag_z: false,
            flag_c: false,
            cycles: 0,
            memory,
            policy: IllegalOpcodePolicy::default(),
            jammed: None,
            nmi_line: false,
        }
    }

    /// Sets how undocumented opcodes are handled.
    pub fn set_illegal_opcode_policy(&mut self, policy: IllegalOpcodePolicy) {
        self.policy = policy;
    }

    /// Returns the active undocumented-opcode policy.
    pub fn illegal_opcode_policy(&self) -> IllegalOpcodePolicy {
        self.policy
    }

    /// Performs a RESET: reloads PC from the reset vector, sets I, clears D
    /// and a jam condition. Registers A/X/Y and memory are left untouched,
    /// matching the hardware.
    pub fn reset(&mut self) {
        self.pc = read_vector(&self.memory, RESET_VECTOR);
        self.sp = 0xFD;
        self.flag_i = true;
        self.flag_d = false;
        self.jammed = None;
        self.nmi_line = self.memory.nmi_active();
    }

    /// Services a pending interrupt or executes one instruction.
    ///
    /// Returns the number of cycles consumed, including page-crossing and
    /// branch penalties.
    ///
    /// # Errors
    ///
    /// - [`ExecutionError::Jammed`] once a KIL opcode has halted the CPU
    /// - [`ExecutionError::IllegalOpcode`] for any undocumented opcode under
    ///   [`IllegalOpcodePolicy::Fatal`]
    ///
    /// # Examples
    ///
    /// ```
    /// use cpu6502::{CPU, FlatMemory, MemoryBus};
    ///
    /// let mut mem = FlatMemory::new();
    /// mem.write(0xFFFD, 0x80);
    /// mem.load(0x8000, &[0xBD, 0xFF, 0x10]); // LDA $10FF,X
    ///
    /// let mut cpu = CPU::new(mem);
    /// cpu.set_x(1);
    /// assert_eq!(cpu.execute_one().unwrap(), 5); // 4 + 1 for the page cross
    /// ```
    pub fn execute_one(&mut self) -> Result<u8, ExecutionError> {
        if let Some(opcode) = self.jammed {
            return Err(ExecutionError::Jammed {
                opcode,
                pc: self.pc,
            });
        }

        let start = self.cycles;

        let nmi = self.memory.nmi_active();
        let nmi_edge = nmi && !self.nmi_line;
        self.nmi_line = nmi;

        if nmi_edge {
            control::enter_interrupt(self, NMI_VECTOR);
        } else if !self.flag_i && self.memory.irq_active() {
            control::enter_interrupt(self, IRQ_VECTOR);
        } else {
            let opcode = self.memory.read(self.pc);
            self.dispatch(opcode)?;
        }

        Ok((self.cycles - start) as u8)
    }

    /// Executes one instruction (or interrupt entry) and advances the CPU state.
    ///
    /// # Examples
    ///
    /// ```
    /// use cpu6502::{CPU, FlatMemory, MemoryBus};
    ///
    /// let mut mem = FlatMemory::new();
    /// mem.write(0xFFFC, 0x00);
    /// mem.write(0xFFFD, 0x80);
    /// mem.write(0x8000, 0xEA); // NOP
    ///
    /// let mut cpu = CPU::new(mem);
    /// cpu.step().unwrap();
    /// assert_eq!(cpu.pc(), 0x8001);
    /// ```
    pub fn step(&mut self) -> Result<(), ExecutionError> {
        self.execute_one().map(|_| ())
    }

    /// Runs the CPU for a specified number of cycles.
    ///
    /// Returns the cycles actually consumed; this may overshoot the budget by
    /// up to one instruction.
    pub fn run_for_cycles(&mut self, cycle_budget: u64) -> Result<u64, ExecutionError> {
        let start_cycles = self.cycles;
        let target_cycles = start_cycles + cycle_budget;

        while self.cycles < target_cycles {
            self.execute_one()?;
        }

        Ok(self.cycles - start_cycles)
    }

    fn dispatch(&mut self, opcode: u8) -> Result<(), ExecutionError> {
        let metadata = &OPCODE_TABLE[opcode as usize];

        if !metadata.documented && self.policy == IllegalOpcodePolicy::Fatal {
            return Err(ExecutionError::IllegalOpcode {
                opcode,
                pc: self.pc,
            });
        }

        match metadata.mnemonic {
            Mnemonic::Adc => alu::execute_adc(self, opcode),
            Mnemonic::Sbc => alu::execute_sbc(self, opcode),
            Mnemonic::And => alu::execute_and(self, opcode),
            Mnemonic::Ora => alu::execute_ora(self, opcode),
            Mnemonic::Eor => alu::execute_eor(self, opcode),
            Mnemonic::Cmp => alu::execute_cmp(self, opcode),
            Mnemonic::Cpx => alu::execute_cpx(self, opcode),
            Mnemonic::Cpy => alu::execute_cpy(self, opcode),
            Mnemonic::Bit => alu::execute_bit(self, opcode),

            Mnemonic::Bcc
            | Mnemonic::Bcs
            | Mnemonic::Bne
            | Mnemonic::Beq
            | Mnemonic::Bpl
            | Mnemonic::Bmi
            | Mnemonic::Bvc
            | Mnemonic::Bvs => {
                let taken = self.branch_condition(metadata.mnemonic);
                branches::execute_branch(self, opcode, taken)
            }

            Mnemonic::Brk => control::execute_brk(self, opcode),
            Mnemonic::Jmp => control::execute_jmp(self, opcode),
            Mnemonic::Jsr => control::execute_jsr(self, opcode),
            Mnemonic::Rts => control::execute_rts(self, opcode),
            Mnemonic::Rti => control::execute_rti(self, opcode),
            Mnemonic::Nop => control::execute_nop(self, opcode),

            Mnemonic::Clc
            | Mnemonic::Sec
            | Mnemonic::Cli
            | Mnemonic::Sei
            | Mnemonic::Cld
            | Mnemonic::Sed
            | Mnemonic::Clv => flags::execute_flag(self, opcode),

            Mnemonic::Inc => inc_dec::execute_inc(self, opcode),
            Mnemonic::Dec => inc_dec::execute_dec(self, opcode),
            Mnemonic::Inx | Mnemonic::Iny | Mnemonic::Dex | Mnemonic::Dey => {
                inc_dec::execute_index_step(self, opcode)
            }

            Mnemonic::Asl | Mnemonic::Lsr | Mnemonic::Rol | Mnemonic::Ror => {
                shifts::execute_shift(self, opcode)
            }

            Mnemonic::Lda => load_store::execute_lda(self, opcode),
            Mnemonic::Ldx => load_store::execute_ldx(self, opcode),
            Mnemonic::Ldy => load_store::execute_ldy(self, opcode),
            Mnemonic::Sta | Mnemonic::Stx | Mnemonic::Sty => {
                load_store::execute_store(self, opcode)
            }

            Mnemonic::Pha => stack::execute_pha(self, opcode),
            Mnemonic::Php => stack::execute_php(self, opcode),
            Mnemonic::Pla => stack::execute_pla(self, opcode),
            Mnemonic::Plp => stack::execute_plp(self, opcode),

            Mnemonic::Tax
            | Mnemonic::Tay
            | Mnemonic::Txa
            | Mnemonic::Tya
            | Mnemonic::Tsx
            | Mnemonic::Txs => transfer::execute_transfer(self, opcode),

            Mnemonic::Slo
            | Mnemonic::Rla
            | Mnemonic::Sre
            | Mnemonic::Rra
            | Mnemonic::Dcp
            | Mnemonic::Isc => illegal::execute_read_modify_combo(self, opcode),
            Mnemonic::Sax => illegal::execute_sax(self, opcode),
            Mnemonic::Lax => illegal::execute_lax(self, opcode),
            Mnemonic::Las => illegal::execute_las(self, opcode),
            Mnemonic::Anc
            | Mnemonic::Alr
            | Mnemonic::Arr
            | Mnemonic::Sbx
            | Mnemonic::Ane
            | Mnemonic::Lxa => illegal::execute_immediate_combo(self, opcode),
            Mnemonic::Sha | Mnemonic::Shx | Mnemonic::Shy | Mnemonic::Tas => {
                illegal::execute_high_byte_store(self, opcode)
            }
            Mnemonic::Jam => {
                log::warn!("CPU jammed by opcode ${:02X} at ${:04X}", opcode, self.pc);
                self.jammed = Some(opcode);
                self.cycles += metadata.base_cycles as u64;
                Err(ExecutionError::Jammed {
                    opcode,
                    pc: self.pc,
                })
            }
        }
    }

    fn branch_condition(&self, mnemonic: Mnemonic) -> bool {
        match mnemonic {
            Mnemonic::Bcc => !self.flag_c,
            Mnemonic::Bcs => self.flag_c,
            Mnemonic::Bne => !self.flag_z,
            Mnemonic::Beq => self.flag_z,
            Mnemonic::Bpl => !self.flag_n,
            Mnemonic::Bmi => self.flag_n,
            Mnemonic::Bvc => !self.flag_v,
            _ => self.flag_v,
        }
    }

    // ========== Internal helpers used by instruction modules ==========

    /// Reads a little-endian word; the high byte address wraps at $FFFF.
    pub(crate) fn read_word(&self, addr: u16) -> u16 {
        let lo = self.memory.read(addr) as u16;
        let hi = self.memory.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Reads a pointer from zero page; the high byte wraps within page 0.
    fn read_zero_page_word(&self, addr: u8) -> u16 {
        let lo = self.memory.read(addr as u16) as u16;
        let hi = self.memory.read(addr.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    pub(crate) fn operand_byte(&self) -> u8 {
        self.memory.read(self.pc.wrapping_add(1))
    }

    pub(crate) fn operand_word(&self) -> u16 {
        self.read_word(self.pc.wrapping_add(1))
    }

    /// Base address of an indexed mode before the index register is added.
    ///
    /// Only meaningful for AbsoluteX, AbsoluteY and IndirectY.
    pub(crate) fn unindexed_base(&self, mode: AddressingMode) -> u16 {
        match mode {
            AddressingMode::IndirectY => self.read_zero_page_word(self.operand_byte()),
            _ => self.operand_word(),
        }
    }

    /// Computes the effective address for a memory addressing mode.
    ///
    /// Returns the address and whether indexing crossed a page boundary.
    /// Immediate, Implicit, Accumulator and Relative have no effective
    /// address; they resolve to the operand location.
    pub(crate) fn effective_address(&self, mode: AddressingMode) -> (u16, bool) {
        match mode {
            AddressingMode::ZeroPage => (self.operand_byte() as u16, false),
            AddressingMode::ZeroPageX => (self.operand_byte().wrapping_add(self.x) as u16, false),
            AddressingMode::ZeroPageY => (self.operand_byte().wrapping_add(self.y) as u16, false),
            AddressingMode::Absolute => (self.operand_word(), false),
            AddressingMode::AbsoluteX => indexed(self.operand_word(), self.x),
            AddressingMode::AbsoluteY => indexed(self.operand_word(), self.y),
            AddressingMode::IndirectX => {
                let ptr = self.operand_byte().wrapping_add(self.x);
                (self.read_zero_page_word(ptr), false)
            }
            AddressingMode::IndirectY => {
                let base = self.read_zero_page_word(self.operand_byte());
                indexed(base, self.y)
            }
            AddressingMode::Indirect => {
                let ptr = self.operand_word();
                // NMOS bug: the high byte is fetched from the same page
                let hi_addr = (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF);
                let lo = self.memory.read(ptr) as u16;
                let hi = self.memory.read(hi_addr) as u16;
                ((hi << 8) | lo, false)
            }
            AddressingMode::Immediate
            | AddressingMode::Relative
            | AddressingMode::Implicit
            | AddressingMode::Accumulator => (self.pc.wrapping_add(1), false),
        }
    }

    /// Fetches the operand value for a read instruction.
    pub(crate) fn get_operand_value(&self, mode: AddressingMode) -> (u8, bool) {
        match mode {
            AddressingMode::Accumulator => (self.a, false),
            AddressingMode::Immediate => (self.operand_byte(), false),
            _ => {
                let (addr, crossed) = self.effective_address(mode);
                (self.memory.read(addr), crossed)
            }
        }
    }

    /// Charges cycles and advances PC past the instruction.
    pub(crate) fn finish(&mut self, metadata: &OpcodeMetadata, page_crossed: bool) {
        let mut cycles = metadata.base_cycles as u64;
        if page_crossed && metadata.page_penalty {
            cycles += 1;
        }
        self.cycles += cycles;
        self.pc = self.pc.wrapping_add(metadata.size_bytes as u16);
    }

    pub(crate) fn set_nz(&mut self, value: u8) {
        self.flag_z = value == 0;
        self.flag_n = (value & 0x80) != 0;
    }

    pub(crate) fn push(&mut self, value: u8) {
        self.memory.write(0x0100 | self.sp as u16, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub(crate) fn pull(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.memory.read(0x0100 | self.sp as u16)
    }

    pub(crate) fn push_word(&mut self, value: u16) {
        self.push((value >> 8) as u8);
        self.push((value & 0xFF) as u8);
    }

    pub(crate) fn pull_word(&mut self) -> u16 {
        let lo = self.pull() as u16;
        let hi = self.pull() as u16;
        (hi << 8) | lo
    }

    // ========== Register Getters ==========

    /// Returns the accumulator register value.
    pub fn a(&self) -> u8 {
        self.a
    }

    /// Returns the X index register value.
    pub fn x(&self) -> u8 {
        self.x
    }

    /// Returns the Y index register value.
    pub fn y(&self) -> u8 {
        self.y
    }

    /// Returns the program counter value.
    pub fn pc(&self) -> u16 {
        self.pc
    }

    /// Returns the stack pointer value.
    ///
    /// Note: The full stack address is 0x0100 + SP. The stack grows downward from 0x01FF.
    pub fn sp(&self) -> u8 {
        self.sp
    }

    /// Returns the status register as a packed byte.
    ///
    /// Bit layout (NV-BDIZC), bit 5 always 1 and B always 0:
    ///
    /// ```
    /// use cpu6502::{CPU, FlatMemory};
    ///
    /// let cpu = CPU::new(FlatMemory::new());
    /// assert_eq!(cpu.status(), 0b0010_0100); // I set
    /// ```
    pub fn status(&self) -> u8 {
        let mut status: u8 = 0b0010_0000;

        if self.flag_n {
            status |= 0b1000_0000;
        }
        if self.flag_v {
            status |= 0b0100_0000;
        }
        if self.flag_d {
            status |= 0b0000_1000;
        }
        if self.flag_i {
            status |= 0b0000_0100;
        }
        if self.flag_z {
            status |= 0b0000_0010;
        }
        if self.flag_c {
            status |= 0b0000_0001;
        }

        status
    }

    /// Loads all flags from a packed status byte. Bits 4 and 5 are ignored.
    pub fn set_status(&mut self, value: u8) {
        self.flag_n = value & 0x80 != 0;
        self.flag_v = value & 0x40 != 0;
        self.flag_d = value & 0x08 != 0;
        self.flag_i = value & 0x04 != 0;
        self.flag_z = value & 0x02 != 0;
        self.flag_c = value & 0x01 != 0;
    }

    /// Returns the total number of CPU cycles executed since initialization.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Charges extra cycles, e.g. for work done on the CPU's behalf by a
    /// host-side trap.
    pub fn add_cycles(&mut self, cycles: u64) {
        self.cycles += cycles;
    }

    /// Returns true once a KIL opcode has halted the processor.
    pub fn is_jammed(&self) -> bool {
        self.jammed.is_some()
    }

    // ========== Status Flag Getters ==========

    /// Returns true if the Negative flag is set.
    pub fn flag_n(&self) -> bool {
        self.flag_n
    }

    /// Returns true if the Overflow flag is set.
    pub fn flag_v(&self) -> bool {
        self.flag_v
    }

    /// Returns true if the Decimal mode flag is set.
    pub fn flag_d(&self) -> bool {
        self.flag_d
    }

    /// Returns true if the Interrupt Disable flag is set.
    pub fn flag_i(&self) -> bool {
        self.flag_i
    }

    /// Returns true if the Zero flag is set.
    pub fn flag_z(&self) -> bool {
        self.flag_z
    }

    /// Returns true if the Carry flag is set.
    pub fn flag_c(&self) -> bool {
        self.flag_c
    }

    // ========== Setters ==========

    pub fn set_a(&mut self, value: u8) {
        self.a = value;
    }

    pub fn set_x(&mut self, value: u8) {
        self.x = value;
    }

    pub fn set_y(&mut self, value: u8) {
        self.y = value;
    }

    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    pub fn set_sp(&mut self, value: u8) {
        self.sp = value;
    }

    pub fn set_flag_n(&mut self, value: bool) {
        self.flag_n = value;
    }

    pub fn set_flag_v(&mut self, value: bool) {
        self.flag_v = value;
    }

    pub fn set_flag_d(&mut self, value: bool) {
        self.flag_d = value;
    }

    pub fn set_flag_i(&mut self, value: bool) {
        self.flag_i = value;
    }

    pub fn set_flag_z(&mut self, value: bool) {
        self.flag_z = value;
    }

    pub fn set_flag_c(&mut self, value: bool) {
        self.flag_c = value;
    }

    // ========== Memory access ==========

    /// Shared access to the memory bus.
    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Mutable access to the memory bus.
    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    // ========== Save State Support ==========

    /// Captures the register file.
    pub fn state(&self) -> CpuState {
        CpuState {
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            pc: self.pc,
            status: self.status(),
            cycles: self.cycles,
            jammed: self.jammed,
            nmi_line: self.nmi_line,
        }
    }

    /// Restores a register file captured by [`CPU::state`].
    pub fn restore_state(&mut self, state: &CpuState) {
        self.a = state.a;
        self.x = state.x;
        self.y = state.y;
        self.sp = state.sp;
        self.pc = state.pc;
        self.set_status(state.status);
        self.cycles = state.cycles;
        self.jammed = state.jammed;
        self.nmi_line = state.nmi_line;
    }
}

fn read_vector<M: MemoryBus>(memory: &M, vector: u16) -> u16 {
    let lo = memory.read(vector) as u16;
    let hi = memory.read(vector.wrapping_add(1)) as u16;
    (hi << 8) | lo
}

fn indexed(base: u16, index: u8) -> (u16, bool) {
    let addr = base.wrapping_add(index as u16);
    (addr, (base & 0xFF00) != (addr & 0xFF00))
}
