//! Main memory.
//!
//! A flat store of 256 byte cells. Programs are installed at address 0 by an
//! external loader, the stack grows down from 231 and the top 24 cells
//! (232-255) are the memory-mapped output region.

use serde::{Serialize, Deserialize};
use std::cell::Cell;
use thiserror::Error;

/// The number of memory cells.
pub const MEMORY_SIZE: usize = 256;

/// First cell of the memory-mapped output region.
pub const OUTPUT_START: usize = 232;

/// Main memory: 256 byte cells.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<u8>,
    /// Last successfully loaded or stored address.
    last_access: Cell<Option<u8>>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
            last_access: Cell::new(None),
        }
    }

    /// Create a memory holding `program` at address 0.
    pub fn from_bytes(program: &[u8]) -> Result<Self, MemoryError> {
        let mut mem = Self::new();
        mem.load_program(0, program)?;
        Ok(mem)
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false; memory has a fixed, non-zero size.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Read a cell.
    ///
    /// Addresses are signed because register-indirect addressing can compute
    /// a negative effective address; those fail like any other out of range
    /// address.
    pub fn load(&self, address: i32) -> Result<u8, MemoryError> {
        let index = self.check(address)?;
        self.last_access.set(Some(index as u8));
        Ok(self.cells[index])
    }

    /// Write a cell.
    pub fn store(&mut self, address: i32, value: u8) -> Result<(), MemoryError> {
        let index = self.check(address)?;
        self.last_access.set(Some(index as u8));
        self.cells[index] = value;
        Ok(())
    }

    fn check(&self, address: i32) -> Result<usize, MemoryError> {
        usize::try_from(address)
            .ok()
            .filter(|&index| index < self.cells.len())
            .ok_or(MemoryError::AddressViolation(address))
    }

    /// The last address touched by `load` or `store`, if any.
    pub fn last_access(&self) -> Option<u8> {
        self.last_access.get()
    }

    /// Zero every cell and forget the last access.
    pub fn reset(&mut self) {
        self.cells.fill(0);
        self.last_access.set(None);
    }

    /// Copy a program into memory starting at `start`.
    ///
    /// This is the loader's back door: it does not touch `last_access`.
    pub fn load_program(&mut self, start: usize, program: &[u8]) -> Result<(), MemoryError> {
        let available = self.cells.len().saturating_sub(start);
        if program.len() > available {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available,
            });
        }

        self.cells[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Read-only view of every cell.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// True if no cell holds a non-zero value.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|&cell| cell == 0)
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, u8)> {
        let end = start.saturating_add(count).min(self.cells.len());
        (start.min(end)..end).map(|i| (i, self.cells[i])).collect()
    }

    /// Text currently shown in the output region starting at `start`.
    ///
    /// Zero and non-printable bytes render as a space.
    pub fn output(&self, start: usize) -> String {
        self.cells
            .iter()
            .skip(start)
            .map(|&b| if b.is_ascii_graphic() { b as char } else { ' ' })
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &self.cells.len())
            .field("last_access", &self.last_access.get())
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Address is outside valid memory range.
    #[error("memory access violation at {0}")]
    AddressViolation(i32),

    /// Program is too large to fit in memory.
    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_load_store() {
        let mut mem = Memory::new();

        mem.store(10, 42).unwrap();
        assert_eq!(mem.load(10).unwrap(), 42);
        assert_eq!(mem.last_access(), Some(10));
    }

    #[test]
    fn test_memory_bounds() {
        let mut mem = Memory::new();

        assert!(mem.load(0).is_ok());
        assert!(mem.load(255).is_ok());

        assert_eq!(mem.load(256), Err(MemoryError::AddressViolation(256)));
        assert_eq!(mem.load(-1), Err(MemoryError::AddressViolation(-1)));
        assert_eq!(mem.store(300, 1), Err(MemoryError::AddressViolation(300)));
    }

    #[test]
    fn test_failed_access_keeps_last_access() {
        let mut mem = Memory::new();
        assert_eq!(mem.last_access(), None);

        mem.load(7).unwrap();
        assert!(mem.store(-3, 1).is_err());
        assert_eq!(mem.last_access(), Some(7));
    }

    #[test]
    fn test_reset() {
        let mut mem = Memory::new();
        mem.store(100, 9).unwrap();

        mem.reset();

        assert!(mem.is_blank());
        assert_eq!(mem.last_access(), None);
    }

    #[test]
    fn test_load_program() {
        let mut mem = Memory::new();
        mem.load_program(0, &[1, 2, 3]).unwrap();

        assert_eq!(mem.cells()[..3], [1, 2, 3]);
        assert_eq!(mem.last_access(), None);
    }

    #[test]
    fn test_load_program_too_large() {
        let mut mem = Memory::new();

        let err = mem.load_program(250, &[0; 7]).unwrap_err();
        assert_eq!(err, MemoryError::ProgramTooLarge { size: 7, available: 6 });

        assert!(Memory::from_bytes(&[1; 257]).is_err());
        assert!(Memory::from_bytes(&[1; 256]).is_ok());
    }

    #[test]
    fn test_output_region() {
        let mut mem = Memory::new();
        mem.load_program(OUTPUT_START, b"Hi!").unwrap();

        let text = mem.output(OUTPUT_START);
        assert_eq!(text.len(), MEMORY_SIZE - OUTPUT_START);
        assert!(text.starts_with("Hi! "));
    }

    #[test]
    fn test_dump_clamps_to_memory() {
        let mem = Memory::new();
        assert_eq!(mem.dump(250, 100).len(), 6);
        assert!(mem.dump(300, 4).is_empty());
    }
}
