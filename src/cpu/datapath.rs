//! Datapath: data memory, registers, ALU and I/O buffers.
//!
//! The registers are private. Every state change goes through one of the
//! latch/ALU/write/emit operations below, each a single control-signal
//! driven transition.

use crate::cpu::memory::{ConfigError, DataMemory, MemoryError};
use log::debug;
use std::collections::VecDeque;
use thiserror::Error;

/// Accumulator input multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccSource {
    Alu,
    Memory,
    Input,
}

/// Left ALU operand multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluLeft {
    /// `memory[data_address]`
    Memory,
    BackRegister,
}

/// Right ALU operand multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluRight {
    Accumulator,
    Zero,
}

/// ALU operation select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    /// `left - right`
    Cmp,
    /// `right mod left`, floored (result takes the sign of `left`).
    Remainder,
    /// `left + right`
    Add,
    /// `left + 1`
    Increment,
}

/// Largest character code accepted from the input stream.
pub const MAX_INPUT_CODE: u32 = 127;

/// The datapath of the machine.
#[derive(Debug, Clone)]
pub struct DataPath {
    memory: DataMemory,
    data_address: usize,
    acc: i64,
    br: i64,
    alu: i64,
    input: VecDeque<char>,
    output: Vec<String>,
}

impl DataPath {
    /// Build a datapath with `memory_size` cells preloaded from `data`.
    pub fn new<I>(memory_size: usize, input: I, data: &[i64]) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = char>,
    {
        Ok(Self {
            memory: DataMemory::new(memory_size, data)?,
            data_address: 0,
            acc: 0,
            br: 0,
            alu: 0,
            input: input.into_iter().collect(),
            output: Vec::new(),
        })
    }

    /// Latch the data-address register.
    ///
    /// Accepts `0..=memory_size`. The upper bound is one past the last cell:
    /// latching it succeeds and the following memory access faults.
    pub fn latch_data_address(&mut self, addr: i64) -> Result<(), DataPathError> {
        let size = self.memory.size();
        match usize::try_from(addr) {
            Ok(index) if index <= size => {
                self.data_address = index;
                Ok(())
            }
            _ => Err(DataPathError::AddressOutOfRange { addr, size }),
        }
    }

    /// Latch the accumulator from the selected source.
    pub fn latch_accumulator(&mut self, source: AccSource) -> Result<(), DataPathError> {
        self.acc = match source {
            AccSource::Alu => self.alu,
            AccSource::Memory => self.memory.read(self.data_address)?,
            AccSource::Input => {
                let symbol = self.input.pop_front().ok_or(DataPathError::InputExhausted)?;
                let code = u32::from(symbol);
                if code > MAX_INPUT_CODE {
                    return Err(DataPathError::CharacterOutOfRange(code));
                }
                i64::from(code)
            }
        };
        Ok(())
    }

    /// Latch the back-register from the ALU result.
    pub fn latch_back_register(&mut self) {
        self.br = self.alu;
    }

    /// Run the ALU and latch its result register.
    pub fn alu_apply(
        &mut self,
        op: AluOp,
        left: AluLeft,
        right: AluRight,
    ) -> Result<(), DataPathError> {
        let left = match left {
            AluLeft::Memory => self.memory.read(self.data_address)?,
            AluLeft::BackRegister => self.br,
        };
        let right = match right {
            AluRight::Accumulator => self.acc,
            AluRight::Zero => 0,
        };

        self.alu = match op {
            AluOp::Cmp => left.checked_sub(right).ok_or(DataPathError::Overflow)?,
            AluOp::Remainder => floored_rem(right, left)?,
            AluOp::Add => left.checked_add(right).ok_or(DataPathError::Overflow)?,
            AluOp::Increment => left.checked_add(1).ok_or(DataPathError::Overflow)?,
        };
        Ok(())
    }

    /// Write `value` to `memory[data_address]`.
    pub fn write_memory(&mut self, value: i64) -> Result<(), DataPathError> {
        self.memory.write(self.data_address, value)?;
        Ok(())
    }

    /// Append the accumulator to the output, as a character or a number.
    pub fn emit_output(&mut self, as_character: bool) -> Result<(), DataPathError> {
        let token = if as_character {
            u32::try_from(self.acc)
                .ok()
                .and_then(char::from_u32)
                .ok_or(DataPathError::InvalidOutputCharacter(self.acc))?
                .to_string()
        } else {
            self.acc.to_string()
        };
        debug!("output: {:?} << {:?}", self.output_text(), token);
        self.output.push(token);
        Ok(())
    }

    /// Whether the accumulator holds zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.acc == 0
    }

    pub fn acc(&self) -> i64 {
        self.acc
    }

    pub fn br(&self) -> i64 {
        self.br
    }

    pub fn data_address(&self) -> usize {
        self.data_address
    }

    pub fn memory(&self) -> &DataMemory {
        &self.memory
    }

    /// Characters still waiting in the input queue.
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Output tokens in emission order.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Output tokens joined into one string.
    pub fn output_text(&self) -> String {
        self.output.concat()
    }
}

/// `value mod divisor` with the result taking the divisor's sign.
fn floored_rem(value: i64, divisor: i64) -> Result<i64, DataPathError> {
    if divisor == 0 {
        return Err(DataPathError::DivisionByZero);
    }
    let rem = value.wrapping_rem(divisor);
    if rem != 0 && (rem < 0) != (divisor < 0) {
        Ok(rem + divisor)
    } else {
        Ok(rem)
    }
}

/// Errors raised by datapath operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataPathError {
    #[error("data address {addr} out of range [0, {size}]")]
    AddressOutOfRange { addr: i64, size: usize },

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("input character code {0} out of range [0, 127]")]
    CharacterOutOfRange(u32),

    #[error("input buffer is empty")]
    InputExhausted,

    #[error("remainder by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("value {0} is not a character code")]
    InvalidOutputCharacter(i64),
}
