//! r16 CPU registers.
//!
//! The machine has:
//! - r0-r7: eight 16-bit general registers
//! - PC: 8-bit program counter into instruction memory
//! - IR: the 16-bit word most recently fetched
//! - EQ: 1-bit equality flag, written by CMP and read by JE

use serde::{Deserialize, Serialize};

/// Number of general registers.
pub const REGISTER_COUNT: usize = 8;

/// The r16 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// General registers r0-r7.
    pub gpr: [u16; REGISTER_COUNT],

    /// Program counter. Being a `u8`, it can only name the 256 instruction
    /// slots, and increments wrap from 255 to 0.
    pub pc: u8,

    /// Instruction register.
    pub ir: u16,

    /// Equality flag. Persists until the next CMP.
    pub eq: bool,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self {
            gpr: [0; REGISTER_COUNT],
            pc: 0,
            ir: 0,
            eq: false,
        }
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read a general register. Only the low 3 bits of `index` are used.
    #[inline]
    pub fn get(&self, index: u8) -> u16 {
        self.gpr[(index & 0x7) as usize]
    }

    /// Write a general register. Only the low 3 bits of `index` are used.
    #[inline]
    pub fn set(&mut self, index: u8, value: u16) {
        self.gpr[(index & 0x7) as usize] = value;
    }

    /// Increment the program counter by 1, wrapping at 256.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u8 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: u8) {
        self.pc = addr;
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let regs = Registers::new();
        assert_eq!(regs.gpr, [0; 8]);
        assert_eq!(regs.pc, 0);
        assert!(!regs.eq);
    }

    #[test]
    fn test_register_index_masked() {
        let mut regs = Registers::new();
        regs.set(9, 42);
        assert_eq!(regs.get(1), 42);
        assert_eq!(regs.get(9), 42);
    }

    #[test]
    fn test_advance_pc() {
        let mut regs = Registers::new();
        regs.pc = 10;

        let old = regs.advance_pc();
        assert_eq!(old, 10);
        assert_eq!(regs.pc, 11);
    }

    #[test]
    fn test_advance_pc_wraps() {
        let mut regs = Registers::new();
        regs.jump(255);
        regs.advance_pc();
        assert_eq!(regs.pc, 0);
    }
}
