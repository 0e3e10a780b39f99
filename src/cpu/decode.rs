//! Instruction decoder for the r16 machine.
//!
//! Every instruction is a single 16-bit word:
//!
//! ```text
//!  15      11 10   8 7    5 4      0
//! +----------+------+------+--------+
//! |  opcode  |  ra  |  rb  |  ----  |   two-register form
//! +----------+------+------+--------+
//! |  opcode  |  ra  |  imm8 / addr8 |   register + byte form
//! +----------+------+---------------+
//! ```
//!
//! The `rb` field and the low byte overlap. Which one an instruction uses is
//! decided by its opcode alone, so decoding always goes through the opcode
//! first and never reads both interpretations.

use crate::asm::encode::{pack, pack_a, pack_r, pack_ri, pack_rr};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The sixteen defined opcodes, by their 5-bit field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Mov = 0,
    Add = 1,
    Sub = 2,
    And = 3,
    Or = 4,
    Sl = 5,
    Sr = 6,
    Sra = 7,
    Ldl = 8,
    Ldh = 9,
    Cmp = 10,
    Je = 11,
    Jmp = 12,
    Ld = 13,
    St = 14,
    Hlt = 15,
}

impl Opcode {
    /// All opcodes in field-value order.
    pub const ALL: [Opcode; 16] = [
        Opcode::Mov,
        Opcode::Add,
        Opcode::Sub,
        Opcode::And,
        Opcode::Or,
        Opcode::Sl,
        Opcode::Sr,
        Opcode::Sra,
        Opcode::Ldl,
        Opcode::Ldh,
        Opcode::Cmp,
        Opcode::Je,
        Opcode::Jmp,
        Opcode::Ld,
        Opcode::St,
        Opcode::Hlt,
    ];

    /// Look up an opcode by its field value. Values 16-31 are undefined.
    pub fn from_bits(bits: u8) -> Option<Self> {
        Self::ALL.get(bits as usize).copied()
    }

    /// The 5-bit field value.
    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Upper-case mnemonic, as printed by the disassembler.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Mov => "MOV",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Sl => "SL",
            Opcode::Sr => "SR",
            Opcode::Sra => "SRA",
            Opcode::Ldl => "LDL",
            Opcode::Ldh => "LDH",
            Opcode::Cmp => "CMP",
            Opcode::Je => "JE",
            Opcode::Jmp => "JMP",
            Opcode::Ld => "LD",
            Opcode::St => "ST",
            Opcode::Hlt => "HLT",
        }
    }
}

/// Raw bit fields of an instruction word, before any opcode is applied.
///
/// `reg_b` and `data8` are views of overlapping bits; at most one of them is
/// meaningful for a given opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fields {
    /// Bits 15-11 (0-31).
    pub opcode: u8,
    /// Bits 10-8 (0-7).
    pub reg_a: u8,
    /// Bits 7-5 (0-7).
    pub reg_b: u8,
    /// Bits 7-0, used as an immediate or an address.
    pub data8: u8,
}

impl Fields {
    /// Split a word into its fields. Total: every word has a split.
    pub const fn split(word: u16) -> Self {
        Self {
            opcode: (word >> 11) as u8,
            reg_a: ((word >> 8) & 0x7) as u8,
            reg_b: ((word >> 5) & 0x7) as u8,
            data8: (word & 0xFF) as u8,
        }
    }
}

/// Decoded instruction.
///
/// Register operands are always 0-7 and byte operands 0-255, because they are
/// produced by masking in [`decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Register / register ====================

    /// `r[ra] := r[rb]`
    Mov { ra: u8, rb: u8 },
    /// `r[ra] := r[ra] + r[rb]` (wrapping)
    Add { ra: u8, rb: u8 },
    /// `r[ra] := r[ra] - r[rb]` (two's complement wrapping)
    Sub { ra: u8, rb: u8 },
    /// `r[ra] := r[ra] & r[rb]`
    And { ra: u8, rb: u8 },
    /// `r[ra] := r[ra] | r[rb]`
    Or { ra: u8, rb: u8 },
    /// `eq := r[ra] == r[rb]`
    Cmp { ra: u8, rb: u8 },

    // ==================== Shifts ====================

    /// Logical shift left by one.
    Sl { ra: u8 },
    /// Logical shift right by one.
    Sr { ra: u8 },
    /// Arithmetic shift right by one, keeping bit 15.
    Sra { ra: u8 },

    // ==================== Immediates ====================

    /// Replace the low byte of `r[ra]`.
    Ldl { ra: u8, imm: u8 },
    /// Replace the high byte of `r[ra]`.
    Ldh { ra: u8, imm: u8 },

    // ==================== Memory ====================

    /// `r[ra] := dmem[addr]`
    Ld { ra: u8, addr: u8 },
    /// `dmem[addr] := r[ra]`
    St { ra: u8, addr: u8 },

    // ==================== Control flow ====================

    /// `if eq { pc := addr }`
    Je { addr: u8 },
    /// `pc := addr`
    Jmp { addr: u8 },
    /// Stop the machine.
    Hlt,
}

impl Instruction {
    /// The opcode this instruction encodes to.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Mov { .. } => Opcode::Mov,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Sub { .. } => Opcode::Sub,
            Instruction::And { .. } => Opcode::And,
            Instruction::Or { .. } => Opcode::Or,
            Instruction::Cmp { .. } => Opcode::Cmp,
            Instruction::Sl { .. } => Opcode::Sl,
            Instruction::Sr { .. } => Opcode::Sr,
            Instruction::Sra { .. } => Opcode::Sra,
            Instruction::Ldl { .. } => Opcode::Ldl,
            Instruction::Ldh { .. } => Opcode::Ldh,
            Instruction::Ld { .. } => Opcode::Ld,
            Instruction::St { .. } => Opcode::St,
            Instruction::Je { .. } => Opcode::Je,
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Hlt => Opcode::Hlt,
        }
    }
}

/// Decode a 16-bit instruction word.
///
/// The opcode is resolved first and then selects the operand shape. Bits an
/// opcode does not use are ignored, so a Hlt word with arbitrary low bits is
/// still Hlt.
pub fn decode(word: u16) -> Result<Instruction, DecodeError> {
    let f = Fields::split(word);
    let op = Opcode::from_bits(f.opcode).ok_or(DecodeError::InvalidOpcode(f.opcode))?;

    let (ra, rb, byte) = (f.reg_a, f.reg_b, f.data8);
    let instruction = match op {
        Opcode::Mov => Instruction::Mov { ra, rb },
        Opcode::Add => Instruction::Add { ra, rb },
        Opcode::Sub => Instruction::Sub { ra, rb },
        Opcode::And => Instruction::And { ra, rb },
        Opcode::Or => Instruction::Or { ra, rb },
        Opcode::Cmp => Instruction::Cmp { ra, rb },
        Opcode::Sl => Instruction::Sl { ra },
        Opcode::Sr => Instruction::Sr { ra },
        Opcode::Sra => Instruction::Sra { ra },
        Opcode::Ldl => Instruction::Ldl { ra, imm: byte },
        Opcode::Ldh => Instruction::Ldh { ra, imm: byte },
        Opcode::Ld => Instruction::Ld { ra, addr: byte },
        Opcode::St => Instruction::St { ra, addr: byte },
        Opcode::Je => Instruction::Je { addr: byte },
        Opcode::Jmp => Instruction::Jmp { addr: byte },
        Opcode::Hlt => Instruction::Hlt,
    };

    Ok(instruction)
}

/// Encode an instruction back to its word.
pub fn encode(instr: &Instruction) -> u16 {
    let op = instr.opcode();
    match *instr {
        Instruction::Mov { ra, rb }
        | Instruction::Add { ra, rb }
        | Instruction::Sub { ra, rb }
        | Instruction::And { ra, rb }
        | Instruction::Or { ra, rb }
        | Instruction::Cmp { ra, rb } => pack_rr(op, ra, rb),
        Instruction::Sl { ra } | Instruction::Sr { ra } | Instruction::Sra { ra } => {
            pack_r(op, ra)
        }
        Instruction::Ldl { ra, imm } | Instruction::Ldh { ra, imm } => {
            pack_ri(op, ra, imm.into())
        }
        Instruction::Ld { ra, addr } | Instruction::St { ra, addr } => {
            pack_ri(op, ra, addr.into())
        }
        Instruction::Je { addr } | Instruction::Jmp { addr } => pack_a(op, addr.into()),
        Instruction::Hlt => pack(op),
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid opcode: {0}")]
    InvalidOpcode(u8),
}
