//! Instruction encoder.
//!
//! Pure functions that pack an opcode and its operands into a word. Nothing
//! here validates: register indices keep their low 3 bits and byte operands
//! their low 8 bits, the same masks the decoder applies. Encoding a register
//! index of 9 and decoding it again therefore yields register 1.

use crate::cpu::decode::Opcode;

#[inline]
const fn op_bits(op: Opcode) -> u16 {
    (op as u16) << 11
}

#[inline]
const fn reg_a(ra: u8) -> u16 {
    ((ra & 0x7) as u16) << 8
}

/// Two-register form: `op | ra | rb`.
pub const fn pack_rr(op: Opcode, ra: u8, rb: u8) -> u16 {
    op_bits(op) | reg_a(ra) | ((rb & 0x7) as u16) << 5
}

/// One-register form; the rb field stays zero.
pub const fn pack_r(op: Opcode, ra: u8) -> u16 {
    op_bits(op) | reg_a(ra)
}

/// Register plus an 8-bit immediate or data address.
pub const fn pack_ri(op: Opcode, ra: u8, val: u16) -> u16 {
    op_bits(op) | reg_a(ra) | (val & 0xFF)
}

/// Address-only form (jumps).
pub const fn pack_a(op: Opcode, addr: u16) -> u16 {
    op_bits(op) | (addr & 0xFF)
}

/// No operands.
pub const fn pack(op: Opcode) -> u16 {
    op_bits(op)
}

pub const fn mov(ra: u8, rb: u8) -> u16 {
    pack_rr(Opcode::Mov, ra, rb)
}

pub const fn add(ra: u8, rb: u8) -> u16 {
    pack_rr(Opcode::Add, ra, rb)
}

pub const fn sub(ra: u8, rb: u8) -> u16 {
    pack_rr(Opcode::Sub, ra, rb)
}

pub const fn and(ra: u8, rb: u8) -> u16 {
    pack_rr(Opcode::And, ra, rb)
}

pub const fn or(ra: u8, rb: u8) -> u16 {
    pack_rr(Opcode::Or, ra, rb)
}

pub const fn sl(ra: u8) -> u16 {
    pack_r(Opcode::Sl, ra)
}

pub const fn sr(ra: u8) -> u16 {
    pack_r(Opcode::Sr, ra)
}

pub const fn sra(ra: u8) -> u16 {
    pack_r(Opcode::Sra, ra)
}

/// Load the low byte of `ra`; only the low 8 bits of `val` are kept.
pub const fn ldl(ra: u8, val: u16) -> u16 {
    pack_ri(Opcode::Ldl, ra, val)
}

/// Load the high byte of `ra`; only the low 8 bits of `val` are kept.
pub const fn ldh(ra: u8, val: u16) -> u16 {
    pack_ri(Opcode::Ldh, ra, val)
}

pub const fn cmp(ra: u8, rb: u8) -> u16 {
    pack_rr(Opcode::Cmp, ra, rb)
}

pub const fn je(addr: u16) -> u16 {
    pack_a(Opcode::Je, addr)
}

pub const fn jmp(addr: u16) -> u16 {
    pack_a(Opcode::Jmp, addr)
}

pub const fn ld(ra: u8, addr: u16) -> u16 {
    pack_ri(Opcode::Ld, ra, addr)
}

pub const fn st(ra: u8, addr: u16) -> u16 {
    pack_ri(Opcode::St, ra, addr)
}

pub const fn hlt() -> u16 {
    pack(Opcode::Hlt)
}
