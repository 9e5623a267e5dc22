//! Translator and disassembler.
//!
//! This module provides:
//! - A two-pass translator (assembly text → program + initial data)
//! - A disassembler (program → readable listing)

pub mod assembler;
pub mod disasm;

pub use assembler::{translate, AssemblerError};
pub use disasm::disassemble;
