//! Micro-operations and the microcode ROM.
//!
//! Each opcode is realised by a fixed routine of micro-operations; the
//! control unit executes one micro-operation per tick.

use crate::isa::Opcode;

/// An atomic datapath action, in terms of the current operands `a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MicroOp {
    /// `DA := a0; ACC := MEM`
    ReadArg0,
    /// `ACC := INPUT; DA := a0; MEM := ACC`
    WriteFromInput,
    /// `DA := ACC; ACC := MEM`
    ReadIndirect,
    /// `DA := a1; MEM := ACC`
    WriteArg1,
    /// `DA := a0; MEM := ACC`
    WriteArg0,
    /// `DA := a0; MEM := BR`
    WriteBrArg0,
    /// `DA := a1; ALU := MEM - ACC; ACC := ALU`
    AluCmp,
    /// `DA := a1; ALU := ACC mod MEM; ACC := ALU`
    AluRem,
    /// `DA := a1; ALU := MEM + ACC; ACC := ALU`
    AluAdd,
    /// `DA := a0; ALU := MEM + 1; BR := ALU`
    IncAtArg0,
    /// Emit ACC as a number.
    OutNum,
    /// Emit ACC as a character.
    OutChar,
    NextPc,
    /// `PC := a0`
    Jump,
    Halt,
    /// `PC := a0` if ACC is zero, else `PC += 1`.
    BranchIfZero,
}

use MicroOp::*;

/// The microcode routine realising `opcode`.
pub const fn routine(opcode: Opcode) -> &'static [MicroOp] {
    match opcode {
        Opcode::Hlt => &[Halt],
        Opcode::Mov => &[ReadArg0, WriteArg1, NextPc],
        Opcode::Cmp => &[ReadArg0, AluCmp, NextPc],
        Opcode::CmpIndirectInc => &[ReadArg0, ReadIndirect, AluCmp, IncAtArg0, WriteBrArg0, NextPc],
        Opcode::Remainder => &[ReadArg0, AluRem, NextPc],
        Opcode::Add => &[ReadArg0, AluAdd, WriteArg1, NextPc],
        Opcode::In => &[WriteFromInput, NextPc],
        Opcode::Out => &[ReadArg0, OutNum, NextPc],
        Opcode::OutChar => &[ReadArg0, OutChar, NextPc],
        Opcode::OutIndirect => &[ReadArg0, ReadIndirect, OutChar, NextPc],
        Opcode::Jmp => &[Jump],
        Opcode::BranchEq => &[BranchIfZero],
        Opcode::Store => &[WriteArg0, NextPc],
    }
}

/// Opcode-indexed microcode store.
///
/// Built once by the simulation driver and lent to the control unit.
#[derive(Debug, Clone)]
pub struct MicrocodeRom {
    routines: [&'static [MicroOp]; Opcode::COUNT],
}

impl MicrocodeRom {
    pub fn new() -> Self {
        Self {
            routines: Opcode::ALL.map(routine),
        }
    }

    /// Micro-operations for `opcode`, in execution order.
    #[inline]
    pub fn routine(&self, opcode: Opcode) -> &'static [MicroOp] {
        self.routines[opcode.index()]
    }

    /// Ticks taken by one instruction with `opcode`.
    pub fn ticks(&self, opcode: Opcode) -> u64 {
        self.routine(opcode).len() as u64
    }
}

impl Default for MicrocodeRom {
    fn default() -> Self {
        Self::new()
    }
}
