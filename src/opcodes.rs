//! # Opcode Metadata Table
//!
//! The 256-entry table describing every NMOS 6502 opcode: the 151 documented
//! instructions and the 105 undocumented ones. The interpreter dispatches on
//! [`Mnemonic`] and charges cycles from `base_cycles`, adding the
//! page-crossing penalty only where `page_penalty` is set.
//!
//! Cycle counts follow the published MOS timing table. Undocumented opcodes
//! use the values measured on real NMOS parts.

use crate::addressing::AddressingMode;
use crate::addressing::AddressingMode::*;

/// Instruction mnemonic, documented and undocumented.
///
/// Undocumented names follow the common NMOS naming (SLO, RLA, LAX, ...).
/// `Jam` covers the twelve KIL opcodes that halt the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    // Documented
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    Ror,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,
    // Undocumented
    Alr,
    Anc,
    Ane,
    Arr,
    Dcp,
    Isc,
    Jam,
    Las,
    Lax,
    Lxa,
    Rla,
    Rra,
    Sax,
    Sbx,
    Sha,
    Shx,
    Shy,
    Slo,
    Sre,
    Tas,
}

impl Mnemonic {
    /// Upper-case three letter name.
    pub const fn name(self) -> &'static str {
        match self {
            Mnemonic::Adc => "ADC",
            Mnemonic::And => "AND",
            Mnemonic::Asl => "ASL",
            Mnemonic::Bcc => "BCC",
            Mnemonic::Bcs => "BCS",
            Mnemonic::Beq => "BEQ",
            Mnemonic::Bit => "BIT",
            Mnemonic::Bmi => "BMI",
            Mnemonic::Bne => "BNE",
            Mnemonic::Bpl => "BPL",
            Mnemonic::Brk => "BRK",
            Mnemonic::Bvc => "BVC",
            Mnemonic::Bvs => "BVS",
            Mnemonic::Clc => "CLC",
            Mnemonic::Cld => "CLD",
            Mnemonic::Cli => "CLI",
            Mnemonic::Clv => "CLV",
            Mnemonic::Cmp => "CMP",
            Mnemonic::Cpx => "CPX",
            Mnemonic::Cpy => "CPY",
            Mnemonic::Dec => "DEC",
            Mnemonic::Dex => "DEX",
            Mnemonic::Dey => "DEY",
            Mnemonic::Eor => "EOR",
            Mnemonic::Inc => "INC",
            Mnemonic::Inx => "INX",
            Mnemonic::Iny => "INY",
            Mnemonic::Jmp => "JMP",
            Mnemonic::Jsr => "JSR",
            Mnemonic::Lda => "LDA",
            Mnemonic::Ldx => "LDX",
            Mnemonic::Ldy => "LDY",
            Mnemonic::Lsr => "LSR",
            Mnemonic::Nop => "NOP",
            Mnemonic::Ora => "ORA",
            Mnemonic::Pha => "PHA",
            Mnemonic::Php => "PHP",
            Mnemonic::Pla => "PLA",
            Mnemonic::Plp => "PLP",
            Mnemonic::Rol => "ROL",
            Mnemonic::Ror => "ROR",
            Mnemonic::Rti => "RTI",
            Mnemonic::Rts => "RTS",
            Mnemonic::Sbc => "SBC",
            Mnemonic::Sec => "SEC",
            Mnemonic::Sed => "SED",
            Mnemonic::Sei => "SEI",
            Mnemonic::Sta => "STA",
            Mnemonic::Stx => "STX",
            Mnemonic::Sty => "STY",
            Mnemonic::Tax => "TAX",
            Mnemonic::Tay => "TAY",
            Mnemonic::Tsx => "TSX",
            Mnemonic::Txa => "TXA",
            Mnemonic::Txs => "TXS",
            Mnemonic::Tya => "TYA",
            Mnemonic::Alr => "ALR",
            Mnemonic::Anc => "ANC",
            Mnemonic::Ane => "ANE",
            Mnemonic::Arr => "ARR",
            Mnemonic::Dcp => "DCP",
            Mnemonic::Isc => "ISC",
            Mnemonic::Jam => "JAM",
            Mnemonic::Las => "LAS",
            Mnemonic::Lax => "LAX",
            Mnemonic::Lxa => "LXA",
            Mnemonic::Rla => "RLA",
            Mnemonic::Rra => "RRA",
            Mnemonic::Sax => "SAX",
            Mnemonic::Sbx => "SBX",
            Mnemonic::Sha => "SHA",
            Mnemonic::Shx => "SHX",
            Mnemonic::Shy => "SHY",
            Mnemonic::Slo => "SLO",
            Mnemonic::Sre => "SRE",
            Mnemonic::Tas => "TAS",
        }
    }
}

/// Metadata for a single 6502 opcode.
///
/// # Examples
///
/// ```
/// use cpu6502::{AddressingMode, Mnemonic, OPCODE_TABLE};
///
/// let lda_imm = &OPCODE_TABLE[0xA9];
/// assert_eq!(lda_imm.mnemonic, Mnemonic::Lda);
/// assert_eq!(lda_imm.addressing_mode, AddressingMode::Immediate);
/// assert_eq!(lda_imm.base_cycles, 2);
/// assert_eq!(lda_imm.size_bytes, 2);
/// assert!(lda_imm.documented);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeMetadata {
    /// Instruction mnemonic.
    pub mnemonic: Mnemonic,

    /// Addressing mode for this instruction.
    pub addressing_mode: AddressingMode,

    /// Base cycle cost before page-crossing and branch penalties.
    pub base_cycles: u8,

    /// Total instruction size in bytes (opcode + operands).
    pub size_bytes: u8,

    /// Whether a read that crosses a page boundary costs one more cycle.
    pub page_penalty: bool,

    /// False for the undocumented NMOS opcodes.
    pub documented: bool,
}

const fn op(mnemonic: Mnemonic, mode: AddressingMode, cycles: u8, page_penalty: bool) -> OpcodeMetadata {
    OpcodeMetadata {
        mnemonic,
        addressing_mode: mode,
        base_cycles: cycles,
        size_bytes: 1 + mode.operand_bytes(),
        page_penalty,
        documented: true,
    }
}

const fn undoc(mnemonic: Mnemonic, mode: AddressingMode, cycles: u8, page_penalty: bool) -> OpcodeMetadata {
    OpcodeMetadata {
        mnemonic,
        addressing_mode: mode,
        base_cycles: cycles,
        size_bytes: 1 + mode.operand_bytes(),
        page_penalty,
        documented: false,
    }
}

/// Complete 256-entry opcode metadata table indexed by opcode byte value.
///
/// # Examples
///
/// ```
/// use cpu6502::{Mnemonic, OPCODE_TABLE};
///
/// let brk = &OPCODE_TABLE[0x00];
/// assert_eq!(brk.mnemonic.name(), "BRK");
/// assert_eq!(brk.base_cycles, 7);
///
/// let kil = &OPCODE_TABLE[0x02];
/// assert_eq!(kil.mnemonic, Mnemonic::Jam);
/// assert!(!kil.documented);
/// ```
#[rustfmt::skip]
pub static OPCODE_TABLE: [OpcodeMetadata; 256] = [
    op(Mnemonic::Brk, Implicit, 7, false), // 0x00
    op(Mnemonic::Ora, IndirectX, 6, false), // 0x01
    undoc(Mnemonic::Jam, Implicit, 2, false), // 0x02
    undoc(Mnemonic::Slo, IndirectX, 8, false), // 0x03
    undoc(Mnemonic::Nop, ZeroPage, 3, false), // 0x04
    op(Mnemonic::Ora, ZeroPage, 3, false), // 0x05
    op(Mnemonic::Asl, ZeroPage, 5, false), // 0x06
    undoc(Mnemonic::Slo, ZeroPage, 5, false), // 0x07
    op(Mnemonic::Php, Implicit, 3, false), // 0x08
    op(Mnemonic::Ora, Immediate, 2, false), // 0x09
    op(Mnemonic::Asl, Accumulator, 2, false), // 0x0A
    undoc(Mnemonic::Anc, Immediate, 2, false), // 0x0B
    undoc(Mnemonic::Nop, Absolute, 4, false), // 0x0C
    op(Mnemonic::Ora, Absolute, 4, false), // 0x0D
    op(Mnemonic::Asl, Absolute, 6, false), // 0x0E
    undoc(Mnemonic::Slo, Absolute, 6, false), // 0x0F
    op(Mnemonic::Bpl, Relative, 2, false), // 0x10
    op(Mnemonic::Ora, IndirectY, 5, true), // 0x11
    undoc(Mnemonic::Jam, Implicit, 2, false), // 0x12
    undoc(Mnemonic::Slo, IndirectY, 8, false), // 0x13
    undoc(Mnemonic::Nop, ZeroPageX, 4, false), // 0x14
    op(Mnemonic::Ora, ZeroPageX, 4, false), // 0x15
    op(Mnemonic::Asl, ZeroPageX, 6, false), // 0x16
    undoc(Mnemonic::Slo, ZeroPageX, 6, false), // 0x17
    op(Mnemonic::Clc, Implicit, 2, false), // 0x18
    op(Mnemonic::Ora, AbsoluteY, 4, true), // 0x19
    undoc(Mnemonic::Nop, Implicit, 2, false), // 0x1A
    undoc(Mnemonic::Slo, AbsoluteY, 7, false), // 0x1B
    undoc(Mnemonic::Nop, AbsoluteX, 4, true), // 0x1C
    op(Mnemonic::Ora, AbsoluteX, 4, true), // 0x1D
    op(Mnemonic::Asl, AbsoluteX, 7, false), // 0x1E
    undoc(Mnemonic::Slo, AbsoluteX, 7, false), // 0x1F
    op(Mnemonic::Jsr, Absolute, 6, false), // 0x20
    op(Mnemonic::And, IndirectX, 6, false), // 0x21
    undoc(Mnemonic::Jam, Implicit, 2, false), // 0x22
    undoc(Mnemonic::Rla, IndirectX, 8, false), // 0x23
    op(Mnemonic::Bit, ZeroPage, 3, false), // 0x24
    op(Mnemonic::And, ZeroPage, 3, false), // 0x25
    op(Mnemonic::Rol, ZeroPage, 5, false), // 0x26
    undoc(Mnemonic::Rla, ZeroPage, 5, false), // 0x27
    op(Mnemonic::Plp, Implicit, 4, false), // 0x28
    op(Mnemonic::And, Immediate, 2, false), // 0x29
    op(Mnemonic::Rol, Accumulator, 2, false), // 0x2A
    undoc(Mnemonic::Anc, Immediate, 2, false), // 0x2B
    op(Mnemonic::Bit, Absolute, 4, false), // 0x2C
    op(Mnemonic::And, Absolute, 4, false), // 0x2D
    op(Mnemonic::Rol, Absolute, 6, false), // 0x2E
    undoc(Mnemonic::Rla, Absolute, 6, false), // 0x2F
    op(Mnemonic::Bmi, Relative, 2, false), // 0x30
    op(Mnemonic::And, IndirectY, 5, true), // 0x31
    undoc(Mnemonic::Jam, Implicit, 2, false), // 0x32
    undoc(Mnemonic::Rla, IndirectY, 8, false), // 0x33
    undoc(Mnemonic::Nop, ZeroPageX, 4, false), // 0x34
    op(Mnemonic::And, ZeroPageX, 4, false), // 0x35
    op(Mnemonic::Rol, ZeroPageX, 6, false), // 0x36
    undoc(Mnemonic::Rla, ZeroPageX, 6, false), // 0x37
    op(Mnemonic::Sec, Implicit, 2, false), // 0x38
    op(Mnemonic::And, AbsoluteY, 4, true), // 0x39
    undoc(Mnemonic::Nop, Implicit, 2, false), // 0x3A
    undoc(Mnemonic::Rla, AbsoluteY, 7, false), // 0x3B
    undoc(Mnemonic::Nop, AbsoluteX, 4, true), // 0x3C
    op(Mnemonic::And, AbsoluteX, 4, true), // 0x3D
    op(Mnemonic::Rol, AbsoluteX, 7, false), // 0x3E
    undoc(Mnemonic::Rla, AbsoluteX, 7, false), // 0x3F
    op(Mnemonic::Rti, Implicit, 6, false), // 0x40
    op(Mnemonic::Eor, IndirectX, 6, false), // 0x41
    undoc(Mnemonic::Jam, Implicit, 2, false), // 0x42
    undoc(Mnemonic::Sre, IndirectX, 8, false), // 0x43
    undoc(Mnemonic::Nop, ZeroPage, 3, false), // 0x44
    op(Mnemonic::Eor, ZeroPage, 3, false), // 0x45
    op(Mnemonic::Lsr, ZeroPage, 5, false), // 0x46
    undoc(Mnemonic::Sre, ZeroPage, 5, false), // 0x47
    op(Mnemonic::Pha, Implicit, 3, false), // 0x48
    op(Mnemonic::Eor, Immediate, 2, false), // 0x49
    op(Mnemonic::Lsr, Accumulator, 2, false), // 0x4A
    undoc(Mnemonic::Alr, Immediate, 2, false), // 0x4B
    op(Mnemonic::Jmp, Absolute, 3, false), // 0x4C
    op(Mnemonic::Eor, Absolute, 4, false), // 0x4D
    op(Mnemonic::Lsr, Absolute, 6, false), // 0x4E
    undoc(Mnemonic::Sre, Absolute, 6, false), // 0x4F
    op(Mnemonic::Bvc, Relative, 2, false), // 0x50
    op(Mnemonic::Eor, IndirectY, 5, true), // 0x51
    undoc(Mnemonic::Jam, Implicit, 2, false), // 0x52
    undoc(Mnemonic::Sre, IndirectY, 8, false), // 0x53
    undoc(Mnemonic::Nop, ZeroPageX, 4, false), // 0x54
    op(Mnemonic::Eor, ZeroPageX, 4, false), // 0x55
    op(Mnemonic::Lsr, ZeroPageX, 6, false), // 0x56
    undoc(Mnemonic::Sre, ZeroPageX, 6, false), // 0x57
    op(Mnemonic::Cli, Implicit, 2, false), // 0x58
    op(Mnemonic::Eor, AbsoluteY, 4, true), // 0x59
    undoc(Mnemonic::Nop, Implicit, 2, false), // 0x5A
    undoc(Mnemonic::Sre, AbsoluteY, 7, false), // 0x5B
    undoc(Mnemonic::Nop, AbsoluteX, 4, true), // 0x5C
    op(Mnemonic::Eor, AbsoluteX, 4, true), // 0x5D
    op(Mnemonic::Lsr, AbsoluteX, 7, false), // 0x5E
    undoc(Mnemonic::Sre, AbsoluteX, 7, false), // 0x5F
    op(Mnemonic::Rts, Implicit, 6, false), // 0x60
    op(Mnemonic::Adc, IndirectX, 6, false), // 0x61
    undoc(Mnemonic::Jam, Implicit, 2, false), // 0x62
    undoc(Mnemonic::Rra, IndirectX, 8, false), // 0x63
    undoc(Mnemonic::Nop, ZeroPage, 3, false), // 0x64
    op(Mnemonic::Adc, ZeroPage, 3, false), // 0x65
    op(Mnemonic::Ror, ZeroPage, 5, false), // 0x66
    undoc(Mnemonic::Rra, ZeroPage, 5, false), // 0x67
    op(Mnemonic::Pla, Implicit, 4, false), // 0x68
    op(Mnemonic::Adc, Immediate, 2, false), // 0x69
    op(Mnemonic::Ror, Accumulator, 2, false), // 0x6A
    undoc(Mnemonic::Arr, Immediate, 2, false), // 0x6B
    op(Mnemonic::Jmp, Indirect, 5, false), // 0x6C
    op(Mnemonic::Adc, Absolute, 4, false), // 0x6D
    op(Mnemonic::Ror, Absolute, 6, false), // 0x6E
    undoc(Mnemonic::Rra, Absolute, 6, false), // 0x6F
    op(Mnemonic::Bvs, Relative, 2, false), // 0x70
    op(Mnemonic::Adc, IndirectY, 5, true), // 0x71
    undoc(Mnemonic::Jam, Implicit, 2, false), // 0x72
    undoc(Mnemonic::Rra, IndirectY, 8, false), // 0x73
    undoc(Mnemonic::Nop, ZeroPageX, 4, false), // 0x74
    op(Mnemonic::Adc, ZeroPageX, 4, false), // 0x75
    op(Mnemonic::Ror, ZeroPageX, 6, false), // 0x76
    undoc(Mnemonic::Rra, ZeroPageX, 6, false), // 0x77
    op(Mnemonic::Sei, Implicit, 2, false), // 0x78
    op(Mnemonic::Adc, AbsoluteY, 4, true), // 0x79
    undoc(Mnemonic::Nop, Implicit, 2, false), // 0x7A
    undoc(Mnemonic::Rra, AbsoluteY, 7, false), // 0x7B
    undoc(Mnemonic::Nop, AbsoluteX, 4, true), // 0x7C
    op(Mnemonic::Adc, AbsoluteX, 4, true), // 0x7D
    op(Mnemonic::Ror, AbsoluteX, 7, false), // 0x7E
    undoc(Mnemonic::Rra, AbsoluteX, 7, false), // 0x7F
    undoc(Mnemonic::Nop, Immediate, 2, false), // 0x80
    op(Mnemonic::Sta, IndirectX, 6, false), // 0x81
    undoc(Mnemonic::Nop, Immediate, 2, false), // 0x82
    undoc(Mnemonic::Sax, IndirectX, 6, false), // 0x83
    op(Mnemonic::Sty, ZeroPage, 3, false), // 0x84
    op(Mnemonic::Sta, ZeroPage, 3, false), // 0x85
    op(Mnemonic::Stx, ZeroPage, 3, false), // 0x86
    undoc(Mnemonic::Sax, ZeroPage, 3, false), // 0x87
    op(Mnemonic::Dey, Implicit, 2, false), // 0x88
    undoc(Mnemonic::Nop, Immediate, 2, false), // 0x89
    op(Mnemonic::Txa, Implicit, 2, false), // 0x8A
    undoc(Mnemonic::Ane, Immediate, 2, false), // 0x8B
    op(Mnemonic::Sty, Absolute, 4, false), // 0x8C
    op(Mnemonic::Sta, Absolute, 4, false), // 0x8D
    op(Mnemonic::Stx, Absolute, 4, false), // 0x8E
    undoc(Mnemonic::Sax, Absolute, 4, false), // 0x8F
    op(Mnemonic::Bcc, Relative, 2, false), // 0x90
    op(Mnemonic::Sta, IndirectY, 6, false), // 0x91
    undoc(Mnemonic::Jam, Implicit, 2, false), // 0x92
    undoc(Mnemonic::Sha, IndirectY, 6, false), // 0x93
    op(Mnemonic::Sty, ZeroPageX, 4, false), // 0x94
    op(Mnemonic::Sta, ZeroPageX, 4, false), // 0x95
    op(Mnemonic::Stx, ZeroPageY, 4, false), // 0x96
    undoc(Mnemonic::Sax, ZeroPageY, 4, false), // 0x97
    op(Mnemonic::Tya, Implicit, 2, false), // 0x98
    op(Mnemonic::Sta, AbsoluteY, 5, false), // 0x99
    op(Mnemonic::Txs, Implicit, 2, false), // 0x9A
    undoc(Mnemonic::Tas, AbsoluteY, 5, false), // 0x9B
    undoc(Mnemonic::Shy, AbsoluteX, 5, false), // 0x9C
    op(Mnemonic::Sta, AbsoluteX, 5, false), // 0x9D
    undoc(Mnemonic::Shx, AbsoluteY, 5, false), // 0x9E
    undoc(Mnemonic::Sha, AbsoluteY, 5, false), // 0x9F
    op(Mnemonic::Ldy, Immediate, 2, false), // 0xA0
    op(Mnemonic::Lda, IndirectX, 6, false), // 0xA1
    op(Mnemonic::Ldx, Immediate, 2, false), // 0xA2
    undoc(Mnemonic::Lax, IndirectX, 6, false), // 0xA3
    op(Mnemonic::Ldy, ZeroPage, 3, false), // 0xA4
    op(Mnemonic::Lda, ZeroPage, 3, false), // 0xA5
    op(Mnemonic::Ldx, ZeroPage, 3, false), // 0xA6
    undoc(Mnemonic::Lax, ZeroPage, 3, false), // 0xA7
    op(Mnemonic::Tay, Implicit, 2, false), // 0xA8
    op(Mnemonic::Lda, Immediate, 2, false), // 0xA9
    op(Mnemonic::Tax, Implicit, 2, false), // 0xAA
    undoc(Mnemonic::Lxa, Immediate, 2, false), // 0xAB
    op(Mnemonic::Ldy, Absolute, 4, false), // 0xAC
    op(Mnemonic::Lda, Absolute, 4, false), // 0xAD
    op(Mnemonic::Ldx, Absolute, 4, false), // 0xAE
    undoc(Mnemonic::Lax, Absolute, 4, false), // 0xAF
    op(Mnemonic::Bcs, Relative, 2, false), // 0xB0
    op(Mnemonic::Lda, IndirectY, 5, true), // 0xB1
    undoc(Mnemonic::Jam, Implicit, 2, false), // 0xB2
    undoc(Mnemonic::Lax, IndirectY, 5, true), // 0xB3
    op(Mnemonic::Ldy, ZeroPageX, 4, false), // 0xB4
    op(Mnemonic::Lda, ZeroPageX, 4, false), // 0xB5
    op(Mnemonic::Ldx, ZeroPageY, 4, false), // 0xB6
    undoc(Mnemonic::Lax, ZeroPageY, 4, false), // 0xB7
    op(Mnemonic::Clv, Implicit, 2, false), // 0xB8
    op(Mnemonic::Lda, AbsoluteY, 4, true), // 0xB9
    op(Mnemonic::Tsx, Implicit, 2, false), // 0xBA
    undoc(Mnemonic::Las, AbsoluteY, 4, true), // 0xBB
    op(Mnemonic::Ldy, AbsoluteX, 4, true), // 0xBC
    op(Mnemonic::Lda, AbsoluteX, 4, true), // 0xBD
    op(Mnemonic::Ldx, AbsoluteY, 4, true), // 0xBE
    undoc(Mnemonic::Lax, AbsoluteY, 4, true), // 0xBF
    op(Mnemonic::Cpy, Immediate, 2, false), // 0xC0
    op(Mnemonic::Cmp, IndirectX, 6, false), // 0xC1
    undoc(Mnemonic::Nop, Immediate, 2, false), // 0xC2
    undoc(Mnemonic::Dcp, IndirectX, 8, false), // 0xC3
    op(Mnemonic::Cpy, ZeroPage, 3, false), // 0xC4
    op(Mnemonic::Cmp, ZeroPage, 3, false), // 0xC5
    op(Mnemonic::Dec, ZeroPage, 5, false), // 0xC6
    undoc(Mnemonic::Dcp, ZeroPage, 5, false), // 0xC7
    op(Mnemonic::Iny, Implicit, 2, false), // 0xC8
    op(Mnemonic::Cmp, Immediate, 2, false), // 0xC9
    op(Mnemonic::Dex, Implicit, 2, false), // 0xCA
    undoc(Mnemonic::Sbx, Immediate, 2, false), // 0xCB
    op(Mnemonic::Cpy, Absolute, 4, false), // 0xCC
    op(Mnemonic::Cmp, Absolute, 4, false), // 0xCD
    op(Mnemonic::Dec, Absolute, 6, false), // 0xCE
    undoc(Mnemonic::Dcp, Absolute, 6, false), // 0xCF
    op(Mnemonic::Bne, Relative, 2, false), // 0xD0
    op(Mnemonic::Cmp, IndirectY, 5, true), // 0xD1
    undoc(Mnemonic::Jam, Implicit, 2, false), // 0xD2
    undoc(Mnemonic::Dcp, IndirectY, 8, false), // 0xD3
    undoc(Mnemonic::Nop, ZeroPageX, 4, false), // 0xD4
    op(Mnemonic::Cmp, ZeroPageX, 4, false), // 0xD5
    op(Mnemonic::Dec, ZeroPageX, 6, false), // 0xD6
    undoc(Mnemonic::Dcp, ZeroPageX, 6, false), // 0xD7
    op(Mnemonic::Cld, Implicit, 2, false), // 0xD8
    op(Mnemonic::Cmp, AbsoluteY, 4, true), // 0xD9
    undoc(Mnemonic::Nop, Implicit, 2, false), // 0xDA
    undoc(Mnemonic::Dcp, AbsoluteY, 7, false), // 0xDB
    undoc(Mnemonic::Nop, AbsoluteX, 4, true), // 0xDC
    op(Mnemonic::Cmp, AbsoluteX, 4, true), // 0xDD
    op(Mnemonic::Dec, AbsoluteX, 7, false), // 0xDE
    undoc(Mnemonic::Dcp, AbsoluteX, 7, false), // 0xDF
    op(Mnemonic::Cpx, Immediate, 2, false), // 0xE0
    op(Mnemonic::Sbc, IndirectX, 6, false), // 0xE1
    undoc(Mnemonic::Nop, Immediate, 2, false), // 0xE2
    undoc(Mnemonic::Isc, IndirectX, 8, false), // 0xE3
    op(Mnemonic::Cpx, ZeroPage, 3, false), // 0xE4
    op(Mnemonic::Sbc, ZeroPage, 3, false), // 0xE5
    op(Mnemonic::Inc, ZeroPage, 5, false), // 0xE6
    undoc(Mnemonic::Isc, ZeroPage, 5, false), // 0xE7
    op(Mnemonic::Inx, Implicit, 2, false), // 0xE8
    op(Mnemonic::Sbc, Immediate, 2, false), // 0xE9
    op(Mnemonic::Nop, Implicit, 2, false), // 0xEA
    undoc(Mnemonic::Sbc, Immediate, 2, false), // 0xEB
    op(Mnemonic::Cpx, Absolute, 4, false), // 0xEC
    op(Mnemonic::Sbc, Absolute, 4, false), // 0xED
    op(Mnemonic::Inc, Absolute, 6, false), // 0xEE
    undoc(Mnemonic::Isc, Absolute, 6, false), // 0xEF
    op(Mnemonic::Beq, Relative, 2, false), // 0xF0
    op(Mnemonic::Sbc, IndirectY, 5, true), // 0xF1
    undoc(Mnemonic::Jam, Implicit, 2, false), // 0xF2
    undoc(Mnemonic::Isc, IndirectY, 8, false), // 0xF3
    undoc(Mnemonic::Nop, ZeroPageX, 4, false), // 0xF4
    op(Mnemonic::Sbc, ZeroPageX, 4, false), // 0xF5
    op(Mnemonic::Inc, ZeroPageX, 6, false), // 0xF6
    undoc(Mnemonic::Isc, ZeroPageX, 6, false), // 0xF7
    op(Mnemonic::Sed, Implicit, 2, false), // 0xF8
    op(Mnemonic::Sbc, AbsoluteY, 4, true), // 0xF9
    undoc(Mnemonic::Nop, Implicit, 2, false), // 0xFA
    undoc(Mnemonic::Isc, AbsoluteY, 7, false), // 0xFB
    undoc(Mnemonic::Nop, AbsoluteX, 4, true), // 0xFC
    op(Mnemonic::Sbc, AbsoluteX, 4, true), // 0xFD
    op(Mnemonic::Inc, AbsoluteX, 7, false), // 0xFE
    undoc(Mnemonic::Isc, AbsoluteX, 7, false), // 0xFF
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_count() {
        let documented = OPCODE_TABLE.iter().filter(|m| m.documented).count();
        assert_eq!(documented, 151);
    }

    #[test]
    fn test_sizes_follow_addressing_mode() {
        assert_eq!(OPCODE_TABLE[0xEA].size_bytes, 1);
        assert_eq!(OPCODE_TABLE[0xA9].size_bytes, 2);
        assert_eq!(OPCODE_TABLE[0x4C].size_bytes, 3);
        assert_eq!(OPCODE_TABLE[0x6C].size_bytes, 3);
        assert_eq!(OPCODE_TABLE[0x0C].size_bytes, 3); // NOP abs
    }

    #[test]
    fn test_store_instructions_never_pay_page_penalty() {
        for meta in OPCODE_TABLE.iter() {
            if matches!(meta.mnemonic, Mnemonic::Sta | Mnemonic::Stx | Mnemonic::Sty) {
                assert!(!meta.page_penalty, "{:?}", meta);
            }
        }
    }

    #[test]
    fn test_read_modify_write_cycles() {
        assert_eq!(OPCODE_TABLE[0x1E].base_cycles, 7); // ASL abs,X
        assert_eq!(OPCODE_TABLE[0xDB].base_cycles, 7); // DCP abs,Y
        assert_eq!(OPCODE_TABLE[0x03].base_cycles, 8); // SLO (zp,X)
    }
}
