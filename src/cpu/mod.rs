//! Micro-operation level model of the accumulator processor.
//!
//! - `memory`: fixed-size signed data memory
//! - `datapath`: ACC, BR, ALU result and data-address registers plus I/O
//! - `microcode`: sixteen micro-operations and the opcode routines
//! - `control`: program counter, tick counter and micro-op dispatch
//! - `simulation`: the run loop with its instruction limit

pub mod memory;
pub mod datapath;
pub mod microcode;
pub mod control;
pub mod simulation;

pub use memory::{ConfigError, DataMemory, MemoryError};
pub use datapath::{AccSource, AluLeft, AluOp, AluRight, DataPath, DataPathError};
pub use microcode::{MicroOp, MicrocodeRom};
pub use control::{ControlUnit, MachineError, Signal};
pub use simulation::{
    run, simulate, SimulationConfig, SimulationError, SimulationReport, StopReason,
};
