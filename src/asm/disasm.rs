//! Disassembler for resolved programs.
//!
//! Operands are printed as the raw addresses the machine sees.

use crate::isa::{Instruction, Program};

/// Disassemble a single instruction to text.
pub fn disassemble_instruction(instr: &Instruction) -> String {
    let mut text = instr.opcode.mnemonic().to_string();
    for arg in &instr.args {
        text.push(' ');
        text.push_str(&arg.to_string());
    }
    text
}

/// Disassemble a whole program as a numbered listing.
pub fn disassemble(program: &Program) -> String {
    let mut output = String::new();
    output.push_str("; Accumulator machine disassembly\n");
    output.push_str("; -------------------------------\n\n");

    for (pc, instr) in program.instructions().iter().enumerate() {
        output.push_str(&format!("{:03}: {}\n", pc, disassemble_instruction(instr)));
    }

    output
}

/// Render initial data memory, eight cells per line.
pub fn dump_data(data: &[i64]) -> String {
    data.chunks(8)
        .enumerate()
        .map(|(row, cells)| {
            let cells: Vec<String> = cells.iter().map(|c| format!("{:>6}", c)).collect();
            format!("{:03}: {}\n", row * 8, cells.join(" "))
        })
        .collect()
}
