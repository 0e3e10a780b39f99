//! Program construction helpers.
//!
//! This module provides:
//! - An instruction encoder (operands → 16-bit words)
//! - A disassembler (words → readable text)
//! - The built-in demo program

pub mod encode;
pub mod disasm;
pub mod demo;

pub use disasm::{disassemble, disassemble_word};
pub use demo::{sum_program, SUM_RESULT_ADDR};
