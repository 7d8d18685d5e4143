//! CPU registers.
//!
//! The register file holds:
//! - A, B, C, D: four 8-bit general-purpose registers
//! - SP: the stack pointer, addressable as register 4 in wide operand contexts
//! - IP: the instruction pointer
//! - the zero and carry flags

use crate::cpu::execute::CpuError;
use serde::{Serialize, Deserialize};

/// Initial (and highest legal) stack pointer value.
pub const STACK_TOP: u8 = 231;

/// Lowest legal stack pointer value.
pub const STACK_BOTTOM: u8 = 0;

/// A general-purpose register.
///
/// Narrow operand contexts (jumps, push/pop, bitwise, shift, mul/div)
/// accept only these four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gpr {
    A,
    B,
    C,
    D,
}

impl Gpr {
    pub const ALL: [Gpr; 4] = [Gpr::A, Gpr::B, Gpr::C, Gpr::D];

    /// Decode a narrow register operand (0-3).
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Operand encoding of this register.
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Gpr::A => "A",
            Gpr::B => "B",
            Gpr::C => "C",
            Gpr::D => "D",
        }
    }
}

/// A register in a wide operand context: any GPR or the stack pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reg {
    Gpr(Gpr),
    Sp,
}

impl Reg {
    /// Operand encoding of the stack pointer.
    pub const SP_INDEX: u8 = 4;

    /// Decode a wide register operand (0-4).
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            Self::SP_INDEX => Some(Reg::Sp),
            _ => Gpr::from_index(index).map(Reg::Gpr),
        }
    }

    /// Operand encoding of this register.
    pub fn index(self) -> u8 {
        match self {
            Reg::Gpr(gpr) => gpr.index(),
            Reg::Sp => Self::SP_INDEX,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Reg::Gpr(gpr) => gpr.name(),
            Reg::Sp => "SP",
        }
    }
}

impl From<Gpr> for Reg {
    fn from(gpr: Gpr) -> Self {
        Reg::Gpr(gpr)
    }
}

/// Status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags {
    pub zero: bool,
    pub carry: bool,
}

/// The register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// A, B, C, D
    pub gpr: [u8; 4],

    /// SP: descending stack pointer, always within [0, 231]
    pub sp: u8,

    /// IP: address of the next opcode.
    ///
    /// May run one past the end of memory after the last instruction;
    /// the next fetch then faults.
    pub ip: usize,

    pub flags: Flags,
}

impl Registers {
    /// Create a register file in its power-on state.
    pub fn new() -> Self {
        Self {
            gpr: [0; 4],
            sp: STACK_TOP,
            ip: 0,
            flags: Flags::default(),
        }
    }

    /// Restore the power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn get(&self, gpr: Gpr) -> u8 {
        self.gpr[gpr as usize]
    }

    #[inline]
    pub fn set(&mut self, gpr: Gpr, value: u8) {
        self.gpr[gpr as usize] = value;
    }

    /// Read a register in the wide context.
    pub fn read(&self, reg: Reg) -> u8 {
        match reg {
            Reg::Gpr(gpr) => self.get(gpr),
            Reg::Sp => self.sp,
        }
    }

    /// Write a register in the wide context.
    ///
    /// Writing SP re-validates the stack bounds.
    pub fn write(&mut self, reg: Reg, value: u8) -> Result<(), CpuError> {
        match reg {
            Reg::Gpr(gpr) => self.set(gpr, value),
            Reg::Sp => {
                if value > STACK_TOP {
                    return Err(CpuError::StackUnderflow);
                }
                self.sp = value;
            }
        }
        Ok(())
    }

    /// Base value of a register-indirect operand.
    pub fn base(&self, reg: Reg) -> i32 {
        self.read(reg) as i32
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
