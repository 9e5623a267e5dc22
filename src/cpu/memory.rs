//! Data memory.
//!
//! A fixed-size array of signed cells. The size is chosen at construction
//! and never changes; cells past the initial contents start at zero.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Data memory of the machine.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMemory {
    cells: Vec<i64>,
}

impl DataMemory {
    /// Create a memory of `size` cells, preloaded from `initial`.
    pub fn new(size: usize, initial: &[i64]) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::ZeroMemorySize);
        }
        if initial.len() > size {
            return Err(ConfigError::DataTooLarge {
                len: initial.len(),
                size,
            });
        }

        let mut cells = vec![0; size];
        cells[..initial.len()].copy_from_slice(initial);
        Ok(Self { cells })
    }

    /// Read a cell.
    #[inline]
    pub fn read(&self, addr: usize) -> Result<i64, MemoryError> {
        self.cells
            .get(addr)
            .copied()
            .ok_or(MemoryError::AddressOutOfRange {
                addr,
                size: self.cells.len(),
            })
    }

    /// Write a cell.
    #[inline]
    pub fn write(&mut self, addr: usize, value: i64) -> Result<(), MemoryError> {
        let size = self.cells.len();
        let cell = self
            .cells
            .get_mut(addr)
            .ok_or(MemoryError::AddressOutOfRange { addr, size })?;
        *cell = value;
        Ok(())
    }

    /// Number of cells.
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[i64] {
        &self.cells
    }

}

impl std::fmt::Debug for DataMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("DataMemory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &self.cells.len())
            .finish()
    }
}

/// Errors raised while building the machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("data memory size must be non-zero")]
    ZeroMemorySize,

    #[error("initial data of {len} cells does not fit in {size} cells of memory")]
    DataTooLarge { len: usize, size: usize },
}

/// Errors raised by memory accesses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory address {addr} out of range for {size} cells")]
    AddressOutOfRange { addr: usize, size: usize },
}
