//! Instruction set of the accumulator machine.
//!
//! Programs reach the simulator fully resolved: every operand is already an
//! integer data address, label index or literal-pool cell.

pub mod image;

pub use image::{load_image, save_image, ImageError, ProgramImage};

use serde::{Deserialize, Serialize};

/// Instruction opcodes.
///
/// The set is closed; each opcode maps to a fixed microcode routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opcode {
    /// Stop the machine.
    Hlt,
    /// `[a1] := [a0]`
    Mov,
    /// `ACC := [a1] - [a0]`, for a following `BranchEq`.
    Cmp,
    /// Compare `[[a0]]` against `[a1]`, then increment the pointer `[a0]`.
    CmpIndirectInc,
    /// `ACC := [a0] mod [a1]`
    Remainder,
    /// `[a1] := [a1] + [a0]`
    Add,
    /// `[a0] := next input character`
    In,
    /// Emit `[a0]` as a decimal number.
    Out,
    /// Emit `[a0]` as a character.
    OutChar,
    /// Emit `[[a0]]` as a character.
    OutIndirect,
    /// `PC := a0`
    Jmp,
    /// `PC := a0` when ACC is zero.
    BranchEq,
    /// `[a0] := ACC`
    Store,
}

impl Opcode {
    /// Number of opcodes.
    pub const COUNT: usize = 13;

    /// Every opcode, in declaration order.
    pub const ALL: [Opcode; Self::COUNT] = [
        Opcode::Hlt,
        Opcode::Mov,
        Opcode::Cmp,
        Opcode::CmpIndirectInc,
        Opcode::Remainder,
        Opcode::Add,
        Opcode::In,
        Opcode::Out,
        Opcode::OutChar,
        Opcode::OutIndirect,
        Opcode::Jmp,
        Opcode::BranchEq,
        Opcode::Store,
    ];

    /// Dense index usable for table lookups.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Assembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Hlt => "hlt",
            Opcode::Mov => "mov",
            Opcode::Cmp => "cmp",
            Opcode::CmpIndirectInc => "cmp*",
            Opcode::Remainder => "rdiv",
            Opcode::Add => "add",
            Opcode::In => "in",
            Opcode::Out => "out",
            Opcode::OutChar => "out_char",
            Opcode::OutIndirect => "out#",
            Opcode::Jmp => "jmp",
            Opcode::BranchEq => "je",
            Opcode::Store => "sv",
        }
    }

    /// Look up an opcode by its assembly mnemonic.
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.mnemonic() == text)
    }

    /// Number of operands the instruction reads.
    pub fn operand_count(self) -> usize {
        match self {
            Opcode::Hlt => 0,
            Opcode::In
            | Opcode::Out
            | Opcode::OutChar
            | Opcode::OutIndirect
            | Opcode::Jmp
            | Opcode::BranchEq
            | Opcode::Store => 1,
            Opcode::Mov
            | Opcode::Cmp
            | Opcode::CmpIndirectInc
            | Opcode::Remainder
            | Opcode::Add => 2,
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A resolved instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Operands: data addresses, jump targets or literal-pool cells.
    pub args: Vec<i64>,
    /// Address of the instruction in the source listing.
    #[serde(default)]
    pub addr: usize,
}

impl Instruction {
    /// Create an instruction.
    pub fn new(opcode: Opcode, args: Vec<i64>, addr: usize) -> Self {
        Self { opcode, args, addr }
    }
}

/// An ordered, immutable list of instructions indexed from 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Build a program from instructions.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Build a program from `(opcode, args)` pairs, numbering addresses in order.
    pub fn from_ops<I>(ops: I) -> Self
    where
        I: IntoIterator<Item = (Opcode, Vec<i64>)>,
    {
        let instructions = ops
            .into_iter()
            .enumerate()
            .map(|(addr, (opcode, args))| Instruction::new(opcode, args, addr))
            .collect();
        Self { instructions }
    }

    /// Instruction at `pc`, if any.
    #[inline]
    pub fn get(&self, pc: usize) -> Option<&Instruction> {
        self.instructions.get(pc)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnemonic_lookup() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(Opcode::from_mnemonic("nop"), None);
    }

    #[test]
    fn test_index_matches_table_position() {
        for (i, op) in Opcode::ALL.iter().enumerate() {
            assert_eq!(op.index(), i);
        }
    }

    #[test]
    fn test_opcode_serde_names() {
        let json = serde_json::to_string(&Opcode::CmpIndirectInc).unwrap();
        assert_eq!(json, "\"cmp_indirect_inc\"");
        let op: Opcode = serde_json::from_str("\"branch_eq\"").unwrap();
        assert_eq!(op, Opcode::BranchEq);
    }

    #[test]
    fn test_from_ops_numbers_addresses() {
        let program = Program::from_ops([
            (Opcode::Mov, vec![0, 1]),
            (Opcode::Hlt, vec![]),
        ]);
        assert_eq!(program.len(), 2);
        assert!(!program.is_empty());
        assert!(Program::default().is_empty());
        assert_eq!(program.get(1).unwrap().addr, 1);
        assert!(program.get(2).is_none());
    }
}
