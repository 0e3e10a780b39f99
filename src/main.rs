//! r16 Emulator - CLI Entry Point
//!
//! Commands:
//! - `r16-emu run` - Run the built-in sum program with a trace
//! - `r16-emu disasm` - Disassemble the built-in sum program
//!
//! With no command the built-in program is run with a trace.

use clap::{Parser, Subcommand};
use r16::cpu::{ConsoleTracer, NullTracer, Tracer};
use r16::{Cpu, CpuError, SUM_RESULT_ADDR};

#[derive(Parser)]
#[command(name = "r16-emu")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "An emulator for a minimal 16-bit, eight-register machine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the built-in program until it halts
    Run {
        /// Maximum number of instructions to execute
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Data memory address reported after halting
        #[arg(short, long, default_value_t = SUM_RESULT_ADDR)]
        report_addr: u8,
        /// Suppress the per-instruction trace
        #[arg(short, long)]
        quiet: bool,
        /// Print the final machine state as JSON
        #[arg(long)]
        dump_state: bool,
    },
    /// Disassemble the built-in program
    Disasm,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { max_cycles, report_addr, quiet, dump_state }) => {
            run_program(max_cycles, report_addr, quiet, dump_state);
        }
        Some(Commands::Disasm) => {
            println!("{}", r16::disassemble(r16::sum_program()));
        }
        None => {
            if let Err(e) = run_default() {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

/// Load the built-in program and run it with the stdout trace.
fn run_default() -> Result<u64, CpuError> {
    let mut cpu = Cpu::new();
    cpu.load_program(r16::sum_program(), 0)?;
    cpu.run()
}

fn run_program(max_cycles: Option<u64>, report_addr: u8, quiet: bool, dump_state: bool) {
    let mut cpu = Cpu::new();
    if let Err(e) = cpu.load_program(r16::sum_program(), 0) {
        eprintln!("error: failed to load program: {}", e);
        std::process::exit(1);
    }

    let mut null = NullTracer;
    let mut console = ConsoleTracer::new(std::io::stdout(), report_addr);
    let tracer: &mut dyn Tracer = if quiet { &mut null } else { &mut console };

    let executed = match cpu.run_traced(tracer, max_cycles) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("error: CPU fault at pc={}: {}", cpu.regs.pc, e);
            std::process::exit(1);
        }
    };

    if quiet {
        println!("ram[{}] = {}", report_addr, cpu.dmem.read(report_addr));
    }

    if let Some(max) = max_cycles {
        if !cpu.is_halted() {
            eprintln!("warning: reached max cycles limit ({}) before HLT", max);
        }
    }
    log::info!("executed {} instructions, state {:?}", executed, cpu.state);

    if dump_state {
        match serde_json::to_string_pretty(&cpu) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: failed to serialize state: {}", e);
                std::process::exit(1);
            }
        }
    }
}
