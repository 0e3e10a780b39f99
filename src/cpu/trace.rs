//! Execution tracing.
//!
//! The CPU reports each fetched instruction to a [`Tracer`] before executing
//! it, and reports the data memory once on halt. [`ConsoleTracer`] prints the
//! classic column trace; a `Vec<Snapshot>` records snapshots for inspection.

use crate::cpu::Memory;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};

/// Data memory cell reported by [`Cpu::run`](crate::Cpu::run) on halt.
pub const DEFAULT_REPORT_ADDR: u8 = 64;

/// Column header matching [`Snapshot`]'s `Display` output.
pub const HEADER: &str = "   pc    ir  reg0  reg1  reg2  reg3";

/// Machine state at the moment an instruction has been fetched but not yet
/// executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Address the instruction was fetched from.
    pub pc: u8,
    /// The fetched word.
    pub ir: u16,
    /// r0-r3.
    pub regs: [u16; 4],
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:5} {:5x} {:5} {:5} {:5} {:5}",
            self.pc, self.ir, self.regs[0], self.regs[1], self.regs[2], self.regs[3]
        )
    }
}

/// Observer of a run.
pub trait Tracer {
    /// Called once before the first instruction of a run.
    fn begin(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Called for every fetched instruction that is about to execute.
    fn fetched(&mut self, snapshot: &Snapshot) -> io::Result<()>;

    /// Called once when the machine halts.
    fn halted(&mut self, _data: &Memory) -> io::Result<()> {
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTracer;

impl Tracer for NullTracer {
    fn fetched(&mut self, _snapshot: &Snapshot) -> io::Result<()> {
        Ok(())
    }
}

impl Tracer for Vec<Snapshot> {
    fn fetched(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        self.push(*snapshot);
        Ok(())
    }
}

/// Prints a header, one line per instruction and the final value of one
/// data memory cell.
pub struct ConsoleTracer<W: Write> {
    out: W,
    report_addr: u8,
}

impl ConsoleTracer<io::Stdout> {
    /// Trace to stdout, reporting `report_addr` on halt.
    pub fn stdout(report_addr: u8) -> Self {
        Self::new(io::stdout(), report_addr)
    }
}

impl<W: Write> ConsoleTracer<W> {
    pub fn new(out: W, report_addr: u8) -> Self {
        Self { out, report_addr }
    }

    /// Recover the writer (for inspecting buffered output).
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Tracer for ConsoleTracer<W> {
    fn begin(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", HEADER)
    }

    fn fetched(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        writeln!(self.out, "{}", snapshot)
    }

    fn halted(&mut self, data: &Memory) -> io::Result<()> {
        writeln!(
            self.out,
            "ram[{}] = {}",
            self.report_addr,
            data.read(self.report_addr)
        )?;
        self.out.flush()
    }
}
