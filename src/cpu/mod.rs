//! CPU emulation.
//!
//! This module implements the complete machine:
//! - 256 byte-sized memory cells
//! - 4 general-purpose registers (A, B, C, D), a descending stack pointer,
//!   an instruction pointer and zero/carry flags
//! - a 74-opcode instruction set with register, register-indirect, direct
//!   and immediate addressing

pub mod memory;
pub mod registers;
pub mod alu;
pub mod opcode;
pub mod decode;
pub mod execute;

pub use memory::{Memory, MemoryError, MEMORY_SIZE, OUTPUT_START};
pub use registers::{Flags, Gpr, Reg, Registers, STACK_TOP};
pub use opcode::Opcode;
pub use decode::{decode, encode, ByteSource, Condition, Indirect, Instruction, LogicOp, MemoryRef, Source, StoreSource, Target};
pub use execute::{Cpu, CpuError};
