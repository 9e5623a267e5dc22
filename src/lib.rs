//! # Accumulator machine
//!
//! A cycle-accurate simulator of a small accumulator processor. Each
//! instruction is executed as a fixed routine of micro-operations driving
//! the datapath through explicit control signals; every micro-operation
//! is one tick.
//!
//! The crate also ships a translator from assembly text to resolved
//! programs, a JSON program image format and a disassembler.

pub mod isa;
pub mod cpu;
pub mod asm;

// Re-export commonly used types
pub use isa::{Instruction, Opcode, Program, ProgramImage, load_image, save_image};
pub use cpu::{
    run, simulate, ControlUnit, DataPath, MachineError, MicroOp, MicrocodeRom, SimulationConfig,
    SimulationError, SimulationReport, StopReason,
};
pub use asm::{disassemble, translate, AssemblerError};
