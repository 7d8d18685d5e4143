//! CPU execution engine.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.
//!
//! Each step is atomic. The instruction is decoded and validated first, its
//! effect is computed on a scratch copy of the register file, and only then
//! is anything committed: the (at most one) memory store, followed by the
//! new register file. A failing step therefore changes nothing but the
//! fault latch.

use crate::cpu::alu;
use crate::cpu::decode::{self, Instruction, MemoryRef, Source, StoreSource, Target, LogicOp};
use crate::cpu::memory::{Memory, MemoryError};
use crate::cpu::registers::{Flags, Gpr, Reg, Registers, STACK_BOTTOM, STACK_TOP};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The CPU: register file plus the sticky fault latch.
///
/// The CPU does not own its memory. Every step is handed the memory it
/// runs against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpu {
    regs: Registers,
    fault: bool,
}

/// Effects of one instruction, computed before anything is committed.
struct Pending {
    regs: Registers,
    store: Option<(i32, u8)>,
}

impl Pending {
    fn set_result(&mut self, gpr: Gpr, (value, flags): (u8, Flags)) {
        self.regs.set(gpr, value);
        self.regs.flags = flags;
    }

    fn write_result(&mut self, reg: Reg, (value, flags): (u8, Flags)) -> Result<(), CpuError> {
        self.regs.write(reg, value)?;
        self.regs.flags = flags;
        Ok(())
    }

    /// Schedule a store of `value` at the stack pointer and move it down.
    fn push(&mut self, value: u8) -> Result<(), CpuError> {
        if self.regs.sp == STACK_BOTTOM {
            return Err(CpuError::StackOverflow);
        }
        self.store = Some((self.regs.sp as i32, value));
        self.regs.sp -= 1;
        Ok(())
    }

    fn pop(&mut self, mem: &Memory) -> Result<u8, CpuError> {
        if self.regs.sp >= STACK_TOP {
            return Err(CpuError::StackUnderflow);
        }
        self.regs.sp += 1;
        Ok(mem.load(self.regs.sp as i32)?)
    }

    fn jump(&mut self, address: usize, mem: &Memory) -> Result<(), CpuError> {
        if address >= mem.len() {
            return Err(CpuError::InvalidAddress(address));
        }
        self.regs.ip = address;
        Ok(())
    }
}

impl Cpu {
    /// Create a CPU in its reset state.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            fault: false,
        }
    }

    /// Reset registers, flags and the fault latch. Memory is left alone.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.fault = false;
    }

    /// Execute a single instruction.
    ///
    /// Returns `false` when the instruction was the halt opcode, `true`
    /// otherwise.
    pub fn step(&mut self, mem: &mut Memory) -> Result<bool, CpuError> {
        self.step_instruction(mem)
            .map(|instr| instr != Instruction::Halt)
    }

    /// Execute a single instruction and return it.
    pub fn step_instruction(&mut self, mem: &mut Memory) -> Result<Instruction, CpuError> {
        if self.fault {
            return Err(CpuError::AlreadyFaulted);
        }

        let result = self.try_step(mem);
        if result.is_err() {
            self.fault = true;
        }
        result
    }

    fn try_step(&mut self, mem: &mut Memory) -> Result<Instruction, CpuError> {
        let ip = self.regs.ip;
        if ip >= mem.len() {
            return Err(MemoryError::AddressViolation(ip as i32).into());
        }

        let (instr, next_ip) = decode::decode(&*mem, ip)?;

        let mut pending = Pending {
            regs: self.regs,
            store: None,
        };
        // Non-jumping instructions resume right after their last operand.
        pending.regs.ip = next_ip;

        self.execute(instr, next_ip, mem, &mut pending)?;

        if let Some((address, value)) = pending.store {
            mem.store(address, value)?;
        }
        self.regs = pending.regs;

        Ok(instr)
    }

    /// Compute the effect of a decoded instruction.
    fn execute(
        &self,
        instr: Instruction,
        next_ip: usize,
        mem: &Memory,
        p: &mut Pending,
    ) -> Result<(), CpuError> {
        let regs = &self.regs;

        match instr {
            Instruction::Halt => {
                // The instruction pointer stays on the halt opcode.
                p.regs.ip = regs.ip;
            }

            // ==================== Data Transfer ====================

            Instruction::Mov { dst, src } => {
                let value = self.read_wide(src, mem)?;
                p.regs.write(dst, value)?;
            }

            Instruction::Store { dst, src } => {
                let value = match src {
                    StoreSource::Register(reg) => regs.read(reg),
                    StoreSource::Immediate(value) => value,
                };
                p.store = Some((dst.address(regs), value));
            }

            // ==================== Arithmetic ====================

            Instruction::Add { dst, src } => {
                let operand = self.read_wide(src, mem)?;
                p.write_result(dst, alu::add(regs.read(dst), operand))?;
            }

            Instruction::Sub { dst, src } => {
                let operand = self.read_wide(src, mem)?;
                p.write_result(dst, alu::sub(regs.read(dst), operand))?;
            }

            Instruction::Cmp { dst, src } => {
                let operand = self.read_wide(src, mem)?;
                let (_, flags) = alu::sub(regs.read(dst), operand);
                p.regs.flags = flags;
            }

            Instruction::Inc(reg) => {
                p.write_result(reg, alu::add(regs.read(reg), 1))?;
            }

            Instruction::Dec(reg) => {
                p.write_result(reg, alu::sub(regs.read(reg), 1))?;
            }

            Instruction::Mul(src) => {
                let operand = self.read_narrow(src, mem)?;
                p.set_result(Gpr::A, alu::mul(regs.get(Gpr::A), operand));
            }

            Instruction::Div(src) => {
                let divisor = self.read_narrow(src, mem)?;
                let result = alu::div(regs.get(Gpr::A), divisor).ok_or(CpuError::DivisionByZero)?;
                p.set_result(Gpr::A, result);
            }

            // ==================== Logic ====================

            Instruction::Logic { op, dst, src } => {
                let a = regs.get(dst);
                let b = self.read_narrow(src, mem)?;
                let result = match op {
                    LogicOp::And => alu::and(a, b),
                    LogicOp::Or => alu::or(a, b),
                    LogicOp::Xor => alu::xor(a, b),
                    LogicOp::Shl => alu::shl(a, b),
                    LogicOp::Shr => alu::shr(a, b),
                };
                p.set_result(dst, result);
            }

            Instruction::Not(gpr) => {
                p.set_result(gpr, alu::not(regs.get(gpr)));
            }

            // ==================== Control Flow ====================

            Instruction::Jump { cond, target } => {
                if cond.holds(regs.flags) {
                    p.jump(self.target(target), mem)?;
                }
            }

            Instruction::Push(src) => {
                let value = self.read_narrow(src, mem)?;
                p.push(value)?;
            }

            Instruction::Pop(gpr) => {
                let value = p.pop(mem)?;
                p.regs.set(gpr, value);
            }

            Instruction::Call(target) => {
                // The return address has to fit in a stack cell.
                let ret = u8::try_from(next_ip).map_err(|_| CpuError::InvalidAddress(next_ip))?;
                p.push(ret)?;
                p.jump(self.target(target), mem)?;
            }

            Instruction::Ret => {
                let address = p.pop(mem)?;
                p.jump(address as usize, mem)?;
            }
        }

        Ok(())
    }

    fn target(&self, target: Target) -> usize {
        match target {
            Target::Register(gpr) => self.regs.get(gpr) as usize,
            Target::Address(addr) => addr as usize,
        }
    }

    fn read_memory(&self, mem_ref: MemoryRef, mem: &Memory) -> Result<u8, CpuError> {
        Ok(mem.load(mem_ref.address(&self.regs))?)
    }

    fn read_wide(&self, src: Source<Reg>, mem: &Memory) -> Result<u8, CpuError> {
        match src {
            Source::Register(reg) => Ok(self.regs.read(reg)),
            Source::Memory(mem_ref) => self.read_memory(mem_ref, mem),
            Source::Immediate(value) => Ok(value),
        }
    }

    fn read_narrow(&self, src: Source<Gpr>, mem: &Memory) -> Result<u8, CpuError> {
        match src {
            Source::Register(gpr) => Ok(self.regs.get(gpr)),
            Source::Memory(mem_ref) => self.read_memory(mem_ref, mem),
            Source::Immediate(value) => Ok(value),
        }
    }

    /// Read-only view of the register file.
    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn gpr(&self, gpr: Gpr) -> u8 {
        self.regs.get(gpr)
    }

    pub fn sp(&self) -> u8 {
        self.regs.sp
    }

    pub fn ip(&self) -> usize {
        self.regs.ip
    }

    pub fn flags(&self) -> Flags {
        self.regs.flags
    }

    /// Check if the fault latch is set.
    pub fn is_faulted(&self) -> bool {
        self.fault
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("invalid register: {0}")]
    InvalidRegister(u8),

    #[error("stack overflow")]
    StackOverflow,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("IP outside memory: {0}")]
    InvalidAddress(usize),

    #[error("division by 0")]
    DivisionByZero,

    #[error("invalid op code: {0}")]
    InvalidOpcode(u8),

    #[error("FAULT. Reset to continue.")]
    AlreadyFaulted,
}
