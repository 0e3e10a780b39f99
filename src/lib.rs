//! # r16 Emulator
//!
//! An emulator for a minimal 16-bit register machine: eight general
//! registers, separate instruction and data memories of 256 words each, and
//! a fixed 16-bit instruction word with sixteen opcodes.
//!
//! Programs are built with the functions in [`asm::encode`], loaded with
//! [`Cpu::load_program`] and run to HLT with [`Cpu::run`].

pub mod cpu;
pub mod asm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, Memory, Registers, Instruction, Opcode, Snapshot, Tracer};
pub use cpu::decode::{decode, encode};
pub use asm::{disassemble, disassemble_word, sum_program, SUM_RESULT_ADDR};
