//! # Assembler Simulator
//!
//! An emulator of a small 8-bit educational CPU.
//!
//! The machine has 256 bytes of memory, four general purpose registers
//! (A, B, C, D), a stack pointer, an instruction pointer and two flags.
//! Programs are byte-encoded and run from address 0; the stack grows down
//! from address 231 and bytes from 232 up are shown as text output.

pub mod cpu;
pub mod machine;
pub mod asm;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuError, Instruction, Memory, MemoryError, Registers};
pub use machine::{CpuState, Machine, Snapshot};
pub use asm::{disassemble, disassemble_at, load_image, save_hex, ImageError};
