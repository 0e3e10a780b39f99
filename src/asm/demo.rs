//! Built-in demo program.
//!
//! Sums 1 + 2 + ... + 10 with a counted loop, storing the running total to
//! data memory on every pass:
//!
//! ```text
//! 00  LDH r0, 0
//! 01  LDL r0, 0      ; r0 = 0   running sum
//! 02  LDH r1, 0
//! 03  LDL r1, 1      ; r1 = 1   step
//! 04  LDH r2, 0
//! 05  LDL r2, 0      ; r2 = 0   counter
//! 06  LDH r3, 0
//! 07  LDL r3, 10     ; r3 = 10  limit
//! 08  ADD r2, r1     ; loop:
//! 09  ADD r0, r2
//! 10  ST  r0, 64
//! 11  CMP r2, r3
//! 12  JE  14
//! 13  JMP 8
//! 14  HLT
//! ```

use crate::asm::encode::{add, cmp, hlt, je, jmp, ldh, ldl, st};
use crate::cpu::trace::DEFAULT_REPORT_ADDR;

/// Data memory cell holding the sum when the program halts. It is the cell
/// [`Cpu::run`](crate::Cpu::run) reports.
pub const SUM_RESULT_ADDR: u8 = DEFAULT_REPORT_ADDR;

/// Address of the HLT word.
pub const SUM_HALT_ADDR: u8 = 14;

const LOOP: u16 = 8;

const SUM_PROGRAM: [u16; 15] = [
    ldh(0, 0),
    ldl(0, 0),
    ldh(1, 0),
    ldl(1, 1),
    ldh(2, 0),
    ldl(2, 0),
    ldh(3, 0),
    ldl(3, 10),
    add(2, 1),
    add(0, 2),
    st(0, SUM_RESULT_ADDR as u16),
    cmp(2, 3),
    je(SUM_HALT_ADDR as u16),
    jmp(LOOP),
    hlt(),
];

/// The encoded demo program, to be loaded at address 0.
pub fn sum_program() -> &'static [u16] {
    &SUM_PROGRAM
}
