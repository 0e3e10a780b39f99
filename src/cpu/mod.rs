//! CPU emulation for the r16 machine.
//!
//! This module implements the complete machine:
//! - 256-word instruction memory and a separate 256-word data memory
//! - 8 general registers, an 8-bit program counter and an equality flag
//! - 16-opcode instruction set in a fixed 16-bit word

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
pub mod trace;

pub use memory::{Memory, MemoryError, MEMORY_SIZE};
pub use registers::{Registers, REGISTER_COUNT};
pub use decode::{Instruction, Opcode, Fields, DecodeError};
pub use execute::{Cpu, CpuError, CpuState};
pub use trace::{Tracer, ConsoleTracer, NullTracer, Snapshot};
