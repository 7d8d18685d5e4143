//! Program tooling that sits outside the CPU.
//!
//! This module provides:
//! - A disassembler (bytes → readable text)
//! - Program image loading and saving (raw binary and hex text)
//! - Bundled sample programs

pub mod disasm;
pub mod image;
pub mod samples;

pub use disasm::{disassemble, disassemble_at, format_address, format_instruction, format_value};
pub use image::{format_hex, load_image, parse_hex, save_hex, ImageError};
