//! Disassembler for r16 programs.
//!
//! Converts encoded words back to readable text. The text is for people
//! only; nothing parses it.

use crate::cpu::decode::{decode, Instruction};

/// Disassemble a single word to text.
pub fn disassemble_word(word: u16) -> String {
    match decode(word) {
        Ok(decoded) => format_instruction(&decoded),
        Err(_) => format!("??? ; {:#06x}", word),
    }
}

/// Disassemble a slice of words into a numbered listing.
pub fn disassemble(words: &[u16]) -> String {
    let mut output = String::new();
    output.push_str("; r16 Disassembly\n");
    output.push_str("; ---------------\n\n");

    for (addr, word) in words.iter().enumerate() {
        let line = disassemble_word(*word);
        output.push_str(&format!("{:03}: {:04x}  {}\n", addr, word, line));
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    let name = instr.opcode().mnemonic();
    match *instr {
        Instruction::Mov { ra, rb }
        | Instruction::Add { ra, rb }
        | Instruction::Sub { ra, rb }
        | Instruction::And { ra, rb }
        | Instruction::Or { ra, rb }
        | Instruction::Cmp { ra, rb } => format!("{} r{}, r{}", name, ra, rb),

        Instruction::Sl { ra } | Instruction::Sr { ra } | Instruction::Sra { ra } => {
            format!("{} r{}", name, ra)
        }

        Instruction::Ldl { ra, imm } | Instruction::Ldh { ra, imm } => {
            format!("{} r{}, {:#04x}", name, ra, imm)
        }

        // Addresses in decimal
        Instruction::Ld { ra, addr } | Instruction::St { ra, addr } => {
            format!("{} r{}, [{}]", name, ra, addr)
        }
        Instruction::Je { addr } | Instruction::Jmp { addr } => format!("{} {}", name, addr),

        Instruction::Hlt => name.to_string(),
    }
}
