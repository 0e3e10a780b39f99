//! Word-addressed memory.
//!
//! The machine has two of these: instruction memory and data memory. They
//! are separate instances, so no address can reach both. Addresses are `u8`,
//! which keeps every access in range without a bounds check at the call site.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of 16-bit words in each memory.
pub const MEMORY_SIZE: usize = 256;

/// 256 sixteen-bit words.
///
/// Serialized as a plain list of words; deserializing a list of any other
/// length fails.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u16>", into = "Vec<u16>")]
pub struct Memory {
    cells: Vec<u16>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    #[inline]
    pub fn read(&self, addr: u8) -> u16 {
        self.cells[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u8, value: u16) {
        self.cells[addr as usize] = value;
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy `program` into consecutive cells starting at `base`.
    ///
    /// Nothing is written if the program would run past the last cell.
    pub fn load_program(&mut self, base: u8, program: &[u16]) -> Result<(), MemoryError> {
        let start = base as usize;
        let available = MEMORY_SIZE - start;
        if program.len() > available {
            return Err(MemoryError::ProgramTooLarge {
                base,
                size: program.len(),
                available,
            });
        }

        self.cells[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }
}

impl TryFrom<Vec<u16>> for Memory {
    type Error = MemoryError;

    fn try_from(cells: Vec<u16>) -> Result<Self, Self::Error> {
        if cells.len() != MEMORY_SIZE {
            return Err(MemoryError::WrongSize(cells.len()));
        }
        Ok(Self { cells })
    }
}

impl From<Memory> for Vec<u16> {
    fn from(mem: Memory) -> Self {
        mem.cells
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero cells
        let non_zero = self.cells.iter().filter(|&&c| c != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("program of {size} words does not fit at address {base} ({available} words available)")]
    ProgramTooLarge { base: u8, size: usize, available: usize },
    #[error("memory image has {0} words, expected 256")]
    WrongSize(usize),
}
