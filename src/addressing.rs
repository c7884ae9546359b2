//! # Addressing Modes
//!
//! The 13 addressing modes of the 6502. A mode determines how many operand
//! bytes follow the opcode and how the effective address is formed.

/// 6502 addressing mode enumeration.
///
/// # Operand Sizes
///
/// - **0 bytes**: Implicit, Accumulator
/// - **1 byte**: Immediate, ZeroPage, ZeroPageX, ZeroPageY, Relative, IndirectX, IndirectY
/// - **2 bytes**: Absolute, AbsoluteX, AbsoluteY, Indirect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    /// No operand, operation implied by instruction (CLC, RTS).
    Implicit,

    /// Operates directly on the accumulator (LSR A).
    Accumulator,

    /// 8-bit constant operand (LDA #$10).
    Immediate,

    /// 8-bit address in zero page (LDA $80).
    ZeroPage,

    /// Zero page address plus X, wrapping within zero page (LDA $80,X).
    ZeroPageX,

    /// Zero page address plus Y, wrapping within zero page (LDX $80,Y).
    ZeroPageY,

    /// Signed 8-bit offset relative to the next instruction (BEQ label).
    Relative,

    /// Full 16-bit address (JMP $1234).
    Absolute,

    /// 16-bit address plus X. Reads pay one extra cycle on a page cross.
    AbsoluteX,

    /// 16-bit address plus Y. Reads pay one extra cycle on a page cross.
    AbsoluteY,

    /// Indirect jump through a 16-bit pointer; JMP only.
    ///
    /// The NMOS part never carries into the pointer's high byte, so
    /// JMP ($10FF) fetches the target from $10FF and $1000.
    Indirect,

    /// Indexed indirect: pointer at (ZP + X) in zero page (LDA ($40,X)).
    IndirectX,

    /// Indirect indexed: pointer at ZP, then plus Y (LDA ($40),Y).
    /// Reads pay one extra cycle on a page cross.
    IndirectY,
}

impl AddressingMode {
    /// Number of operand bytes following the opcode.
    pub const fn operand_bytes(self) -> u8 {
        match self {
            AddressingMode::Implicit | AddressingMode::Accumulator => 0,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::Relative
            | AddressingMode::IndirectX
            | AddressingMode::IndirectY => 1,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
        }
    }
}
