//! # 6502 Instruction Implementations
//!
//! Implementations of all 6502 instructions, organized by category. Each
//! instruction is a standalone function that takes a mutable reference to
//! the CPU and the opcode byte; the opcode selects the addressing mode and
//! cycle cost from the opcode table.
//!
//! ## Categories
//!
//! - **alu**: ADC, SBC (binary and decimal), AND, ORA, EOR, CMP, CPX, CPY, BIT
//! - **branches**: BCC, BCS, BEQ, BNE, BMI, BPL, BVC, BVS
//! - **shifts**: ASL, LSR, ROL, ROR
//! - **load_store**: LDA, LDX, LDY, STA, STX, STY
//! - **inc_dec**: INC, DEC, INX, INY, DEX, DEY
//! - **control**: JMP, JSR, RTS, RTI, BRK, NOP and hardware interrupt entry
//! - **stack**: PHA, PHP, PLA, PLP
//! - **flags**: CLC, SEC, CLI, SEI, CLD, SED, CLV
//! - **transfer**: TAX, TAY, TXA, TYA, TSX, TXS
//! - **illegal**: undocumented NMOS opcodes

pub mod alu;
pub mod branches;
pub mod control;
pub mod flags;
pub mod illegal;
pub mod inc_dec;
pub mod load_store;
pub mod shifts;
pub mod stack;
pub mod transfer;
