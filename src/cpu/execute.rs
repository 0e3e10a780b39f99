//! CPU execution engine for the r16 machine.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::cpu::decode::{self, DecodeError, Instruction};
use crate::cpu::memory::MemoryError;
use crate::cpu::trace::{ConsoleTracer, NullTracer, Snapshot, Tracer, DEFAULT_REPORT_ADDR};
use crate::cpu::{Memory, Registers};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has fetched a HLT instruction.
    Halted,
    /// CPU fetched a word it could not decode.
    Error,
}

/// The r16 CPU.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Instruction memory. Only written by [`Cpu::load_program`].
    pub imem: Memory,
    /// Data memory, read and written by LD/ST.
    pub dmem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instructions executed so far. HLT is not counted.
    pub cycles: u64,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a new CPU with zeroed state.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            imem: Memory::new(),
            dmem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            last_instr: None,
        }
    }

    /// Reset the CPU to initial state, clearing both memories.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.imem.clear();
        self.dmem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Write encoded instructions into instruction memory starting at `base`.
    pub fn load_program(&mut self, program: &[u16], base: u8) -> Result<(), MemoryError> {
        self.imem.load_program(base, program)?;
        log::debug!("loaded {} words at {}", program.len(), base);
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was fetched. Fetching HLT halts the CPU
    /// and leaves the program counter on the HLT word.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        self.step_traced(&mut NullTracer)
    }

    /// Execute a single instruction, reporting it to `tracer` first.
    pub fn step_traced(&mut self, tracer: &mut dyn Tracer) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        // Fetch
        let pc = self.regs.pc;
        self.regs.ir = self.imem.read(pc);

        // Decode
        let instr = match decode::decode(self.regs.ir) {
            Ok(instr) => instr,
            Err(e) => {
                log::debug!("fault at pc={}: {} (word {:#06x})", pc, e, self.regs.ir);
                self.state = CpuState::Error;
                return Err(e.into());
            }
        };

        if instr == Instruction::Hlt {
            self.state = CpuState::Halted;
            log::debug!("halted at pc={} after {} instructions", pc, self.cycles);
            tracer.halted(&self.dmem).map_err(trace_error)?;
            return Ok(instr);
        }

        tracer.fetched(&self.snapshot()).map_err(trace_error)?;

        // Advance PC before execute (jumps will override)
        self.regs.advance_pc();

        self.execute(instr);

        self.cycles += 1;
        self.last_instr = Some(instr);
        log::trace!("{:03}: {:?}", pc, instr);

        Ok(instr)
    }

    /// Run until halt, printing the execution trace to stdout and the value
    /// of data memory cell [`DEFAULT_REPORT_ADDR`] on halt.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        self.run_traced(&mut ConsoleTracer::stdout(DEFAULT_REPORT_ADDR), None)
    }

    /// Run until halt without any output.
    pub fn run_quiet(&mut self) -> Result<u64, CpuError> {
        self.run_traced(&mut NullTracer, None)
    }

    /// Run for at most `max_cycles` instructions, without output.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        self.run_traced(&mut NullTracer, Some(max_cycles))
    }

    /// Run until halt, error, or `limit` executed instructions.
    ///
    /// Stopping at the limit is not an error; check [`Cpu::is_halted`].
    /// A CPU that has already halted or faulted is refused with
    /// [`CpuError::NotRunning`] before the tracer sees anything.
    pub fn run_traced(
        &mut self,
        tracer: &mut dyn Tracer,
        limit: Option<u64>,
    ) -> Result<u64, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        let start_cycles = self.cycles;
        tracer.begin().map_err(trace_error)?;

        while self.state == CpuState::Running {
            if limit.is_some_and(|max| self.cycles - start_cycles >= max) {
                log::debug!("cycle limit reached at pc={}", self.regs.pc);
                break;
            }
            self.step_traced(tracer)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Execute a decoded instruction. The PC already points past it.
    fn execute(&mut self, instr: Instruction) {
        let r = &mut self.regs;
        match instr {
            Instruction::Mov { ra, rb } => {
                let value = r.get(rb);
                r.set(ra, value);
            }

            Instruction::Add { ra, rb } => {
                let sum = r.get(ra).wrapping_add(r.get(rb));
                r.set(ra, sum);
            }

            Instruction::Sub { ra, rb } => {
                let diff = (r.get(ra) as i16).wrapping_sub(r.get(rb) as i16) as u16;
                r.set(ra, diff);
            }

            Instruction::And { ra, rb } => {
                let value = r.get(ra) & r.get(rb);
                r.set(ra, value);
            }

            Instruction::Or { ra, rb } => {
                let value = r.get(ra) | r.get(rb);
                r.set(ra, value);
            }

            Instruction::Sl { ra } => {
                let value = r.get(ra) << 1;
                r.set(ra, value);
            }

            Instruction::Sr { ra } => {
                let value = r.get(ra) >> 1;
                r.set(ra, value);
            }

            Instruction::Sra { ra } => {
                let value = r.get(ra);
                r.set(ra, (value & 0x8000) | (value >> 1));
            }

            Instruction::Ldl { ra, imm } => {
                let value = (r.get(ra) & 0xFF00) | u16::from(imm);
                r.set(ra, value);
            }

            Instruction::Ldh { ra, imm } => {
                let value = (u16::from(imm) << 8) | (r.get(ra) & 0x00FF);
                r.set(ra, value);
            }

            Instruction::Cmp { ra, rb } => {
                r.eq = r.get(ra) == r.get(rb);
            }

            Instruction::Je { addr } => {
                if r.eq {
                    r.jump(addr);
                }
            }

            Instruction::Jmp { addr } => {
                r.jump(addr);
            }

            Instruction::Ld { ra, addr } => {
                r.set(ra, self.dmem.read(addr));
            }

            Instruction::St { ra, addr } => {
                self.dmem.write(addr, r.get(ra));
            }

            Instruction::Hlt => {
                self.state = CpuState::Halted;
            }
        }
    }

    /// Current PC, IR and r0-r3.
    pub fn snapshot(&self) -> Snapshot {
        let g = &self.regs.gpr;
        Snapshot {
            pc: self.regs.pc,
            ir: self.regs.ir,
            regs: [g[0], g[1], g[2], g[3]],
        }
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

fn trace_error(e: std::io::Error) -> CpuError {
    CpuError::Trace(e.to_string())
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("memory error: {0}")]
    MemoryError(#[from] MemoryError),

    #[error("decode error: {0}")]
    DecodeError(#[from] DecodeError),

    #[error("trace output failed: {0}")]
    Trace(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::encode::*;
    use proptest::prelude::*;

    fn load(program: &[u16]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(program, 0).unwrap();
        cpu
    }

    /// Run a program with some registers preset, return the CPU.
    fn run_with(regs: &[(u8, u16)], program: &[u16]) -> Cpu {
        let mut cpu = load(program);
        for &(r, v) in regs {
            cpu.regs.set(r, v);
        }
        cpu.run_quiet().unwrap();
        cpu
    }

    #[test]
    fn test_cpu_halt() {
        let mut cpu = load(&[hlt()]);

        let executed = cpu.run_quiet().unwrap();

        assert_eq!(executed, 0);
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.pc, 0);
        assert_eq!(cpu.regs.ir, 0x7800);
    }

    #[test]
    fn test_step_after_halt_fails() {
        let mut cpu = load(&[hlt()]);
        assert_eq!(cpu.step().unwrap(), Instruction::Hlt);
        assert_eq!(cpu.step(), Err(CpuError::NotRunning(CpuState::Halted)));
    }

    #[test]
    fn test_mov() {
        let cpu = run_with(&[(5, 1234)], &[mov(0, 5), hlt()]);
        assert_eq!(cpu.regs.get(0), 1234);
        assert_eq!(cpu.regs.get(5), 1234);
    }

    #[test]
    fn test_add_wraps() {
        let cpu = run_with(&[(0, 0xFFFF), (1, 2)], &[add(0, 1), hlt()]);
        assert_eq!(cpu.regs.get(0), 1);
    }

    #[test]
    fn test_sub_wraps() {
        let cpu = run_with(&[(0, 0), (1, 1)], &[sub(0, 1), hlt()]);
        assert_eq!(cpu.regs.get(0), 0xFFFF);

        let cpu = run_with(&[(2, 0x8000), (3, 1)], &[sub(2, 3), hlt()]);
        assert_eq!(cpu.regs.get(2), 0x7FFF);
    }

    #[test]
    fn test_and_or() {
        let cpu = run_with(
            &[(0, 0b1100), (1, 0b1010), (2, 0b1100)],
            &[and(0, 1), or(2, 1), hlt()],
        );
        assert_eq!(cpu.regs.get(0), 0b1000);
        assert_eq!(cpu.regs.get(2), 0b1110);
    }

    #[test]
    fn test_shifts() {
        let cpu = run_with(
            &[(0, 0x8000), (1, 0x8000), (2, 0x8001)],
            &[sra(0), sr(1), sl(2), hlt()],
        );
        assert_eq!(cpu.regs.get(0), 0xC000);
        assert_eq!(cpu.regs.get(1), 0x4000);
        assert_eq!(cpu.regs.get(2), 0x0002);
    }

    #[test]
    fn test_sra_positive() {
        let cpu = run_with(&[(4, 0x4002)], &[sra(4), hlt()]);
        assert_eq!(cpu.regs.get(4), 0x2001);
    }

    #[test]
    fn test_ldl_keeps_high_byte() {
        let cpu = run_with(&[(3, 0xAB00)], &[ldl(3, 0x1CD), hlt()]);
        assert_eq!(cpu.regs.get(3), 0xABCD);
    }

    #[test]
    fn test_ldh_keeps_low_byte() {
        let cpu = run_with(&[(3, 0x00CD)], &[ldh(3, 0xAB), hlt()]);
        assert_eq!(cpu.regs.get(3), 0xABCD);
    }

    #[test]
    fn test_load_store_use_data_memory() {
        let mut cpu = load(&[ld(1, 200), st(1, 3), hlt()]);
        cpu.dmem.write(200, 77);
        cpu.run_quiet().unwrap();

        assert_eq!(cpu.regs.get(1), 77);
        assert_eq!(cpu.dmem.read(3), 77);
        // Instruction memory is a separate namespace.
        assert_eq!(cpu.imem.read(3), 0);
    }

    #[test]
    fn test_jmp_replaces_pc() {
        let mut cpu = load(&[jmp(5)]);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 5);
    }

    #[test]
    fn test_je_taken_and_not_taken() {
        let mut cpu = load(&[je(9)]);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 1);

        let mut cpu = load(&[je(9)]);
        cpu.regs.eq = true;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 9);
    }

    #[test]
    fn test_flag_survives_other_instructions() {
        let mut cpu = load(&[cmp(0, 1), ldl(0, 5), add(0, 0), je(7)]);
        for _ in 0..4 {
            cpu.step().unwrap();
        }
        assert!(cpu.regs.eq);
        assert_eq!(cpu.regs.pc, 7);
    }

    #[test]
    fn test_pc_wraps_at_end_of_memory() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[mov(0, 0)], 255).unwrap();
        cpu.regs.pc = 255;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0);
    }

    #[test]
    fn test_undefined_opcode_is_fatal() {
        let mut cpu = load(&[mov(0, 0), 0xF800]);

        assert!(cpu.step().is_ok());
        assert_eq!(
            cpu.step(),
            Err(CpuError::DecodeError(DecodeError::InvalidOpcode(31)))
        );
        assert_eq!(cpu.state, CpuState::Error);
        assert_eq!(cpu.regs.pc, 1);
        assert_eq!(cpu.run_quiet(), Err(CpuError::NotRunning(CpuState::Error)));
    }

    #[test]
    fn test_run_after_halt_refused_without_output() {
        let mut cpu = load(&[hlt()]);
        cpu.run_quiet().unwrap();

        let mut tracer = ConsoleTracer::new(Vec::new(), 0);
        assert_eq!(
            cpu.run_traced(&mut tracer, None),
            Err(CpuError::NotRunning(CpuState::Halted))
        );
        assert!(tracer.into_inner().is_empty());
    }

    #[test]
    fn test_deserialized_cpu_with_short_memory_rejected() {
        let mut state = serde_json::to_value(Cpu::new()).unwrap();
        state["dmem"] = serde_json::json!([0, 0, 0]);
        assert!(serde_json::from_value::<Cpu>(state).is_err());
    }

    #[test]
    fn test_serialized_cpu_round_trips() {
        let mut cpu = load(&[st(0, 64), hlt()]);
        cpu.regs.set(0, 9);
        let json = serde_json::to_string(&cpu).unwrap();

        let mut back: Cpu = serde_json::from_str(&json).unwrap();
        back.run_quiet().unwrap();
        assert_eq!(back.dmem.read(64), 9);
    }

    #[test]
    fn test_run_limited_stops_without_error() {
        // Tight loop: JMP 0
        let mut cpu = load(&[jmp(0)]);
        let executed = cpu.run_limited(25).unwrap();

        assert_eq!(executed, 25);
        assert!(cpu.is_running());
        assert_eq!(cpu.last_instruction(), Some(Instruction::Jmp { addr: 0 }));
    }

    #[test]
    fn test_snapshots_taken_before_execute() {
        let mut cpu = load(&[ldl(0, 7), add(0, 0), hlt()]);
        let mut trace: Vec<Snapshot> = Vec::new();
        cpu.run_traced(&mut trace, None).unwrap();

        assert_eq!(
            trace,
            vec![
                Snapshot { pc: 0, ir: ldl(0, 7), regs: [0, 0, 0, 0] },
                Snapshot { pc: 1, ir: add(0, 0), regs: [7, 0, 0, 0] },
            ]
        );
        assert_eq!(cpu.regs.get(0), 14);
    }

    #[test]
    fn test_reset() {
        let mut cpu = run_with(&[(0, 9)], &[st(0, 1), hlt()]);
        cpu.reset();

        assert!(cpu.is_running());
        assert_eq!(cpu.cycles, 0);
        assert_eq!(cpu.regs, Registers::new());
        assert_eq!(cpu.dmem.read(1), 0);
        assert_eq!(cpu.imem.read(0), 0);
    }

    #[test]
    fn test_instances_are_independent() {
        let a = run_with(&[(0, 1)], &[st(0, 0), hlt()]);
        let b = Cpu::new();
        assert_eq!(a.dmem.read(0), 1);
        assert_eq!(b.dmem.read(0), 0);
    }

    proptest! {
        #[test]
        fn prop_ldh_ldl_rebuild_value(r in 0u8..8, v in any::<u16>(), high_first in any::<bool>()) {
            let (hi, lo) = (ldh(r, v >> 8), ldl(r, v & 0xFF));
            let program = if high_first { [hi, lo, hlt()] } else { [lo, hi, hlt()] };

            let cpu = run_with(&[(r, 0x5A5A)], &program);
            prop_assert_eq!(cpu.regs.get(r), v);
        }

        #[test]
        fn prop_cmp_sets_flag_iff_equal(
            ra in 0u8..8,
            rb in 0u8..8,
            va in any::<u16>(),
            vb in prop_oneof![Just(0u16), any::<u16>()],
            prior in any::<bool>(),
        ) {
            let mut cpu = load(&[cmp(ra, rb)]);
            cpu.regs.set(ra, va);
            cpu.regs.set(rb, vb);
            cpu.regs.eq = prior;
            let expected = cpu.regs.get(ra) == cpu.regs.get(rb);

            cpu.step().unwrap();
            prop_assert_eq!(cpu.regs.eq, expected);
        }

        #[test]
        fn prop_hlt_with_any_low_bits_halts(low in 0u16..0x800) {
            let mut cpu = load(&[0x7800 | low]);
            let executed = cpu.run_quiet().unwrap();

            prop_assert!(cpu.is_halted());
            prop_assert_eq!(executed, 0);
            prop_assert_eq!(cpu.regs.pc, 0);
        }

        #[test]
        fn prop_je_moves_pc_iff_flag(addr in any::<u8>(), flag in any::<bool>()) {
            let mut cpu = load(&[je(addr.into())]);
            cpu.regs.eq = flag;
            cpu.step().unwrap();

            prop_assert_eq!(cpu.regs.pc, if flag { addr } else { 1 });
        }
    }
}
