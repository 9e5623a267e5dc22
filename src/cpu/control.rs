//! Control unit.
//!
//! Fetches the instruction at the program counter, looks up its microcode
//! routine and drives the datapath one micro-operation per tick.

use crate::cpu::datapath::{AccSource, AluLeft, AluOp, AluRight, DataPath, DataPathError};
use crate::cpu::microcode::{MicroOp, MicrocodeRom};
use crate::isa::Program;
use log::{log_enabled, trace, Level};
use thiserror::Error;

/// Outcome of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The instruction finished; keep going.
    Continue,
    /// A `Halt` micro-operation ran.
    Halt,
}

/// The control unit of the machine.
#[derive(Debug)]
pub struct ControlUnit<'rom> {
    datapath: DataPath,
    program: Program,
    rom: &'rom MicrocodeRom,
    program_counter: usize,
    tick: u64,
    args: Vec<i64>,
}

impl<'rom> ControlUnit<'rom> {
    pub fn new(datapath: DataPath, program: Program, rom: &'rom MicrocodeRom) -> Self {
        Self {
            datapath,
            program,
            rom,
            program_counter: 0,
            tick: 0,
            args: Vec::new(),
        }
    }

    /// Decode and execute the instruction at the program counter.
    ///
    /// The tick counter advances after each micro-operation that completes;
    /// a failing micro-operation leaves it untouched.
    pub fn step(&mut self) -> Result<Signal, MachineError> {
        let pc = self.program_counter;
        let instr = self
            .program
            .get(pc)
            .ok_or(MachineError::ProgramCounterOutOfRange {
                pc,
                len: self.program.len(),
            })?;
        let routine = self.rom.routine(instr.opcode);
        self.args.clone_from(&instr.args);

        for &micro_op in routine {
            let signal = self.execute(micro_op)?;
            self.tick += 1;
            if log_enabled!(Level::Trace) {
                trace!("{}", self);
            }
            if signal == Signal::Halt {
                return Ok(Signal::Halt);
            }
        }
        Ok(Signal::Continue)
    }

    fn execute(&mut self, micro_op: MicroOp) -> Result<Signal, MachineError> {
        let dp = &mut self.datapath;
        match micro_op {
            MicroOp::ReadArg0 => {
                dp.latch_data_address(self.args.arg(0, self.program_counter)?)?;
                dp.latch_accumulator(AccSource::Memory)?;
            }
            MicroOp::WriteFromInput => {
                dp.latch_accumulator(AccSource::Input)?;
                dp.latch_data_address(self.args.arg(0, self.program_counter)?)?;
                dp.write_memory(dp.acc())?;
            }
            MicroOp::ReadIndirect => {
                dp.latch_data_address(dp.acc())?;
                dp.latch_accumulator(AccSource::Memory)?;
            }
            MicroOp::WriteArg1 => {
                dp.latch_data_address(self.args.arg(1, self.program_counter)?)?;
                dp.write_memory(dp.acc())?;
            }
            MicroOp::WriteArg0 => {
                dp.latch_data_address(self.args.arg(0, self.program_counter)?)?;
                dp.write_memory(dp.acc())?;
            }
            MicroOp::WriteBrArg0 => {
                dp.latch_data_address(self.args.arg(0, self.program_counter)?)?;
                dp.write_memory(dp.br())?;
            }
            MicroOp::AluCmp => self.alu_binary(AluOp::Cmp)?,
            MicroOp::AluRem => self.alu_binary(AluOp::Remainder)?,
            MicroOp::AluAdd => self.alu_binary(AluOp::Add)?,
            MicroOp::IncAtArg0 => {
                dp.latch_data_address(self.args.arg(0, self.program_counter)?)?;
                dp.alu_apply(AluOp::Increment, AluLeft::Memory, AluRight::Zero)?;
                dp.latch_back_register();
            }
            MicroOp::OutNum => dp.emit_output(false)?,
            MicroOp::OutChar => dp.emit_output(true)?,
            MicroOp::NextPc => self.program_counter += 1,
            MicroOp::Jump => {
                self.program_counter = self.jump_target()?;
            }
            MicroOp::Halt => return Ok(Signal::Halt),
            MicroOp::BranchIfZero => {
                if self.datapath.is_zero() {
                    self.program_counter = self.jump_target()?;
                } else {
                    self.program_counter += 1;
                }
            }
        }
        Ok(Signal::Continue)
    }

    /// `DA := a1`, run `op` on `MEM` and `ACC`, latch the result into ACC.
    fn alu_binary(&mut self, op: AluOp) -> Result<(), MachineError> {
        let addr = self.args.arg(1, self.program_counter)?;
        let dp = &mut self.datapath;
        dp.latch_data_address(addr)?;
        dp.alu_apply(op, AluLeft::Memory, AluRight::Accumulator)?;
        dp.latch_accumulator(AccSource::Alu)?;
        Ok(())
    }

    fn jump_target(&self) -> Result<usize, MachineError> {
        let target = self.args.arg(0, self.program_counter)?;
        usize::try_from(target).map_err(|_| MachineError::InvalidJumpTarget {
            pc: self.program_counter,
            target,
        })
    }

    pub fn program_counter(&self) -> usize {
        self.program_counter
    }

    /// Micro-operations executed so far.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Operands of the instruction being executed.
    pub fn current_args(&self) -> &[i64] {
        &self.args
    }

    pub fn datapath(&self) -> &DataPath {
        &self.datapath
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Give up the control unit, keeping the datapath.
    pub fn into_datapath(self) -> DataPath {
        self.datapath
    }
}

impl std::fmt::Display for ControlUnit<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dp = &self.datapath;
        write!(
            f,
            "{{TICK: {}, ADDR: {}, PC: {}, MEM: ",
            self.tick,
            dp.data_address(),
            self.program_counter
        )?;
        match dp.memory().read(dp.data_address()) {
            Ok(value) => write!(f, "{}", value)?,
            Err(_) => f.write_str("-")?,
        }
        write!(f, ", ACC: {}}}", dp.acc())
    }
}

/// Operand access with a diagnosable error.
trait Operands {
    fn arg(&self, index: usize, pc: usize) -> Result<i64, MachineError>;
}

impl Operands for Vec<i64> {
    #[inline]
    fn arg(&self, index: usize, pc: usize) -> Result<i64, MachineError> {
        self.get(index)
            .copied()
            .ok_or(MachineError::MissingOperand { pc, index })
    }
}

/// Errors that stop the machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("program counter {pc} outside program of {len} instructions")]
    ProgramCounterOutOfRange { pc: usize, len: usize },

    #[error("instruction at {pc} has no operand {index}")]
    MissingOperand { pc: usize, index: usize },

    #[error("instruction at {pc} jumps to negative address {target}")]
    InvalidJumpTarget { pc: usize, target: i64 },

    #[error(transparent)]
    DataPath(#[from] DataPathError),
}

impl MachineError {
    /// Whether this is the input queue running dry.
    pub fn is_input_exhausted(&self) -> bool {
        matches!(self, MachineError::DataPath(DataPathError::InputExhausted))
    }
}
