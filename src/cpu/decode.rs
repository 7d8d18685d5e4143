//! Instruction decoder and encoder.
//!
//! An instruction is one opcode byte followed by zero, one or two operand
//! bytes, destination first. Operand bytes are decoded into typed values:
//! narrow registers ([`Gpr`]), wide registers ([`Reg`], which can name the
//! stack pointer), register-indirect references ([`Indirect`]), direct
//! addresses and immediates. Register operands are validated here, so an
//! [`Instruction`] value is always executable as far as its encoding goes.

use crate::cpu::execute::CpuError;
use crate::cpu::memory::{Memory, MemoryError};
use crate::cpu::opcode::Opcode;
use crate::cpu::registers::{Flags, Gpr, Reg, Registers};
use serde::{Serialize, Deserialize};

/// Anything instructions can be fetched from.
pub trait ByteSource {
    fn fetch(&self, address: i32) -> Result<u8, MemoryError>;
}

impl ByteSource for Memory {
    fn fetch(&self, address: i32) -> Result<u8, MemoryError> {
        self.load(address)
    }
}

/// Plain byte slices, for decoding program images that are not loaded.
impl ByteSource for [u8] {
    fn fetch(&self, address: i32) -> Result<u8, MemoryError> {
        usize::try_from(address)
            .ok()
            .and_then(|index| self.get(index).copied())
            .ok_or(MemoryError::AddressViolation(address))
    }
}

/// A register-indirect operand: base register plus a signed offset.
///
/// Encoded in one byte: the low 3 bits select the base (0-3 a GPR, 4-7 the
/// stack pointer) and the high 5 bits hold the offset in two's complement,
/// giving a range of -16..=15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Indirect {
    pub base: Reg,
    pub offset: i8,
}

impl Indirect {
    pub const MIN_OFFSET: i8 = -16;
    pub const MAX_OFFSET: i8 = 15;

    pub fn new(base: Reg, offset: i8) -> Self {
        debug_assert!((Self::MIN_OFFSET..=Self::MAX_OFFSET).contains(&offset));
        Self { base, offset }
    }

    /// Decode an operand byte. Every byte is a valid indirect operand.
    pub fn from_byte(value: u8) -> Self {
        let base = Gpr::from_index(value % 8).map_or(Reg::Sp, Reg::Gpr);

        let mut offset = (value / 8) as i8;
        if offset > Self::MAX_OFFSET {
            offset -= 32;
        }

        Self { base, offset }
    }

    /// Encode as an operand byte.
    pub fn to_byte(self) -> u8 {
        ((self.offset as u8) & 0x1f) << 3 | self.base.index()
    }

    /// Effective address against the given register file.
    ///
    /// Not bounds-checked; the memory access that follows does that.
    pub fn address(self, regs: &Registers) -> i32 {
        regs.base(self.base) + self.offset as i32
    }
}

/// A memory operand: a direct address or a register-indirect reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryRef {
    Address(u8),
    Indirect(Indirect),
}

impl MemoryRef {
    pub fn address(self, regs: &Registers) -> i32 {
        match self {
            MemoryRef::Address(addr) => addr as i32,
            MemoryRef::Indirect(ind) => ind.address(regs),
        }
    }
}

/// A source operand. `R` is the register context: [`Gpr`] for narrow
/// instructions, [`Reg`] for wide ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source<R> {
    Register(R),
    Memory(MemoryRef),
    Immediate(u8),
}

/// The value stored by a MOV into memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreSource {
    Register(Reg),
    Immediate(u8),
}

/// Jump, call target: a register's value or an absolute address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    Register(Gpr),
    Address(u8),
}

/// Jump conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Always,
    Carry,
    NotCarry,
    Zero,
    NotZero,
    /// Unsigned greater-than after a compare: neither zero nor carry.
    Above,
    NotAbove,
}

impl Condition {
    pub fn holds(self, flags: Flags) -> bool {
        match self {
            Condition::Always => true,
            Condition::Carry => flags.carry,
            Condition::NotCarry => !flags.carry,
            Condition::Zero => flags.zero,
            Condition::NotZero => !flags.zero,
            Condition::Above => !flags.zero && !flags.carry,
            Condition::NotAbove => flags.zero || flags.carry,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Condition::Always => "JMP",
            Condition::Carry => "JC",
            Condition::NotCarry => "JNC",
            Condition::Zero => "JZ",
            Condition::NotZero => "JNZ",
            Condition::Above => "JA",
            Condition::NotAbove => "JNA",
        }
    }
}

/// Binary operations on a narrow destination register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl LogicOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            LogicOp::And => "AND",
            LogicOp::Or => "OR",
            LogicOp::Xor => "XOR",
            LogicOp::Shl => "SHL",
            LogicOp::Shr => "SHR",
        }
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Opcode 0: stop the run loop.
    Halt,

    // ==================== Data Transfer ====================

    /// dst := src
    Mov { dst: Reg, src: Source<Reg> },

    /// [dst] := src
    Store { dst: MemoryRef, src: StoreSource },

    // ==================== Arithmetic ====================

    /// dst := dst + src
    Add { dst: Reg, src: Source<Reg> },

    /// dst := dst - src
    Sub { dst: Reg, src: Source<Reg> },

    /// Flags of dst - src, result discarded.
    Cmp { dst: Reg, src: Source<Reg> },

    Inc(Reg),

    Dec(Reg),

    /// A := A * src
    Mul(Source<Gpr>),

    /// A := A / src
    Div(Source<Gpr>),

    // ==================== Logic ====================

    /// dst := dst <op> src
    Logic { op: LogicOp, dst: Gpr, src: Source<Gpr> },

    Not(Gpr),

    // ==================== Control Flow ====================

    Jump { cond: Condition, target: Target },

    Push(Source<Gpr>),

    Pop(Gpr),

    Call(Target),

    Ret,
}

impl Instruction {
    /// The opcode this instruction encodes to.
    pub fn opcode(&self) -> Opcode {
        use Opcode as O;

        match *self {
            Instruction::Halt => O::None,
            Instruction::Mov { src, .. } => match src {
                Source::Register(_) => O::MovRegToReg,
                Source::Memory(MemoryRef::Address(_)) => O::MovAddressToReg,
                Source::Memory(MemoryRef::Indirect(_)) => O::MovRegaddressToReg,
                Source::Immediate(_) => O::MovNumberToReg,
            },
            Instruction::Store { dst, src } => match (dst, src) {
                (MemoryRef::Address(_), StoreSource::Register(_)) => O::MovRegToAddress,
                (MemoryRef::Indirect(_), StoreSource::Register(_)) => O::MovRegToRegaddress,
                (MemoryRef::Address(_), StoreSource::Immediate(_)) => O::MovNumberToAddress,
                (MemoryRef::Indirect(_), StoreSource::Immediate(_)) => O::MovNumberToRegaddress,
            },
            Instruction::Add { src, .. } => {
                by_source(src, [O::AddRegToReg, O::AddRegaddressToReg, O::AddAddressToReg, O::AddNumberToReg])
            }
            Instruction::Sub { src, .. } => {
                by_source(src, [O::SubRegFromReg, O::SubRegaddressFromReg, O::SubAddressFromReg, O::SubNumberFromReg])
            }
            Instruction::Cmp { src, .. } => {
                by_source(src, [O::CmpRegWithReg, O::CmpRegaddressWithReg, O::CmpAddressWithReg, O::CmpNumberWithReg])
            }
            Instruction::Inc(_) => O::IncReg,
            Instruction::Dec(_) => O::DecReg,
            Instruction::Mul(src) => by_source(src, [O::MulReg, O::MulRegaddress, O::MulAddress, O::MulNumber]),
            Instruction::Div(src) => by_source(src, [O::DivReg, O::DivRegaddress, O::DivAddress, O::DivNumber]),
            Instruction::Logic { op, src, .. } => {
                let table = match op {
                    LogicOp::And => [O::AndRegWithReg, O::AndRegaddressWithReg, O::AndAddressWithReg, O::AndNumberWithReg],
                    LogicOp::Or => [O::OrRegWithReg, O::OrRegaddressWithReg, O::OrAddressWithReg, O::OrNumberWithReg],
                    LogicOp::Xor => [O::XorRegWithReg, O::XorRegaddressWithReg, O::XorAddressWithReg, O::XorNumberWithReg],
                    LogicOp::Shl => [O::ShlRegWithReg, O::ShlRegaddressWithReg, O::ShlAddressWithReg, O::ShlNumberWithReg],
                    LogicOp::Shr => [O::ShrRegWithReg, O::ShrRegaddressWithReg, O::ShrAddressWithReg, O::ShrNumberWithReg],
                };
                by_source(src, table)
            }
            Instruction::Not(_) => O::NotReg,
            Instruction::Jump { cond, target } => {
                let (reg, addr) = match cond {
                    Condition::Always => (O::JmpRegaddress, O::JmpAddress),
                    Condition::Carry => (O::JcRegaddress, O::JcAddress),
                    Condition::NotCarry => (O::JncRegaddress, O::JncAddress),
                    Condition::Zero => (O::JzRegaddress, O::JzAddress),
                    Condition::NotZero => (O::JnzRegaddress, O::JnzAddress),
                    Condition::Above => (O::JaRegaddress, O::JaAddress),
                    Condition::NotAbove => (O::JnaRegaddress, O::JnaAddress),
                };
                match target {
                    Target::Register(_) => reg,
                    Target::Address(_) => addr,
                }
            }
            Instruction::Push(src) => {
                by_source(src, [O::PushReg, O::PushRegaddress, O::PushAddress, O::PushNumber])
            }
            Instruction::Pop(_) => O::PopReg,
            Instruction::Call(Target::Register(_)) => O::CallRegaddress,
            Instruction::Call(Target::Address(_)) => O::CallAddress,
            Instruction::Ret => O::Ret,
        }
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        1 + self.opcode().operand_count()
    }
}

/// Pick the opcode for a source operand from a
/// `[register, indirect, address, immediate]` table.
fn by_source<R>(src: Source<R>, table: [Opcode; 4]) -> Opcode {
    match src {
        Source::Register(_) => table[0],
        Source::Memory(MemoryRef::Indirect(_)) => table[1],
        Source::Memory(MemoryRef::Address(_)) => table[2],
        Source::Immediate(_) => table[3],
    }
}

/// Sequential operand reader.
struct Operands<'a, S: ?Sized> {
    source: &'a S,
    /// Address of the last byte consumed.
    ip: usize,
}

impl<S: ByteSource + ?Sized> Operands<'_, S> {
    fn byte(&mut self) -> Result<u8, CpuError> {
        self.ip += 1;
        Ok(self.source.fetch(self.ip as i32)?)
    }

    fn gpr(&mut self) -> Result<Gpr, CpuError> {
        let index = self.byte()?;
        Gpr::from_index(index).ok_or(CpuError::InvalidRegister(index))
    }

    fn reg(&mut self) -> Result<Reg, CpuError> {
        let index = self.byte()?;
        Reg::from_index(index).ok_or(CpuError::InvalidRegister(index))
    }

    fn indirect(&mut self) -> Result<Indirect, CpuError> {
        Ok(Indirect::from_byte(self.byte()?))
    }

    fn address(&mut self) -> Result<MemoryRef, CpuError> {
        Ok(MemoryRef::Address(self.byte()?))
    }

    fn regaddress(&mut self) -> Result<MemoryRef, CpuError> {
        Ok(MemoryRef::Indirect(self.indirect()?))
    }
}

/// Decode the instruction whose opcode sits at `ip`.
///
/// Returns the instruction and the address just past its last byte.
pub fn decode<S: ByteSource + ?Sized>(source: &S, ip: usize) -> Result<(Instruction, usize), CpuError> {
    let opcode = source.fetch(ip as i32)?;
    let opcode = Opcode::try_from(opcode).map_err(CpuError::InvalidOpcode)?;

    let mut o = Operands { source, ip };

    use Opcode as O;
    let instr = match opcode {
        O::None => Instruction::Halt,

        O::MovRegToReg => Instruction::Mov { dst: o.reg()?, src: Source::Register(o.reg()?) },
        O::MovAddressToReg => Instruction::Mov { dst: o.reg()?, src: Source::Memory(o.address()?) },
        O::MovRegaddressToReg => Instruction::Mov { dst: o.reg()?, src: Source::Memory(o.regaddress()?) },
        O::MovRegToAddress => Instruction::Store { dst: o.address()?, src: StoreSource::Register(o.reg()?) },
        O::MovRegToRegaddress => Instruction::Store { dst: o.regaddress()?, src: StoreSource::Register(o.reg()?) },
        O::MovNumberToReg => Instruction::Mov { dst: o.reg()?, src: Source::Immediate(o.byte()?) },
        O::MovNumberToAddress => Instruction::Store { dst: o.address()?, src: StoreSource::Immediate(o.byte()?) },
        O::MovNumberToRegaddress => Instruction::Store { dst: o.regaddress()?, src: StoreSource::Immediate(o.byte()?) },

        O::AddRegToReg => Instruction::Add { dst: o.reg()?, src: Source::Register(o.reg()?) },
        O::AddRegaddressToReg => Instruction::Add { dst: o.reg()?, src: Source::Memory(o.regaddress()?) },
        O::AddAddressToReg => Instruction::Add { dst: o.reg()?, src: Source::Memory(o.address()?) },
        O::AddNumberToReg => Instruction::Add { dst: o.reg()?, src: Source::Immediate(o.byte()?) },
        O::SubRegFromReg => Instruction::Sub { dst: o.reg()?, src: Source::Register(o.reg()?) },
        O::SubRegaddressFromReg => Instruction::Sub { dst: o.reg()?, src: Source::Memory(o.regaddress()?) },
        O::SubAddressFromReg => Instruction::Sub { dst: o.reg()?, src: Source::Memory(o.address()?) },
        O::SubNumberFromReg => Instruction::Sub { dst: o.reg()?, src: Source::Immediate(o.byte()?) },
        O::IncReg => Instruction::Inc(o.reg()?),
        O::DecReg => Instruction::Dec(o.reg()?),
        O::CmpRegWithReg => Instruction::Cmp { dst: o.reg()?, src: Source::Register(o.reg()?) },
        O::CmpRegaddressWithReg => Instruction::Cmp { dst: o.reg()?, src: Source::Memory(o.regaddress()?) },
        O::CmpAddressWithReg => Instruction::Cmp { dst: o.reg()?, src: Source::Memory(o.address()?) },
        O::CmpNumberWithReg => Instruction::Cmp { dst: o.reg()?, src: Source::Immediate(o.byte()?) },

        O::JmpRegaddress => jump(Condition::Always, Target::Register(o.gpr()?)),
        O::JmpAddress => jump(Condition::Always, Target::Address(o.byte()?)),
        O::JcRegaddress => jump(Condition::Carry, Target::Register(o.gpr()?)),
        O::JcAddress => jump(Condition::Carry, Target::Address(o.byte()?)),
        O::JncRegaddress => jump(Condition::NotCarry, Target::Register(o.gpr()?)),
        O::JncAddress => jump(Condition::NotCarry, Target::Address(o.byte()?)),
        O::JzRegaddress => jump(Condition::Zero, Target::Register(o.gpr()?)),
        O::JzAddress => jump(Condition::Zero, Target::Address(o.byte()?)),
        O::JnzRegaddress => jump(Condition::NotZero, Target::Register(o.gpr()?)),
        O::JnzAddress => jump(Condition::NotZero, Target::Address(o.byte()?)),
        O::JaRegaddress => jump(Condition::Above, Target::Register(o.gpr()?)),
        O::JaAddress => jump(Condition::Above, Target::Address(o.byte()?)),
        O::JnaRegaddress => jump(Condition::NotAbove, Target::Register(o.gpr()?)),
        O::JnaAddress => jump(Condition::NotAbove, Target::Address(o.byte()?)),

        O::PushReg => Instruction::Push(Source::Register(o.gpr()?)),
        O::PushRegaddress => Instruction::Push(Source::Memory(o.regaddress()?)),
        O::PushAddress => Instruction::Push(Source::Memory(o.address()?)),
        O::PushNumber => Instruction::Push(Source::Immediate(o.byte()?)),
        O::PopReg => Instruction::Pop(o.gpr()?),
        O::CallRegaddress => Instruction::Call(Target::Register(o.gpr()?)),
        O::CallAddress => Instruction::Call(Target::Address(o.byte()?)),
        O::Ret => Instruction::Ret,

        O::MulReg => Instruction::Mul(Source::Register(o.gpr()?)),
        O::MulRegaddress => Instruction::Mul(Source::Memory(o.regaddress()?)),
        O::MulAddress => Instruction::Mul(Source::Memory(o.address()?)),
        O::MulNumber => Instruction::Mul(Source::Immediate(o.byte()?)),
        O::DivReg => Instruction::Div(Source::Register(o.gpr()?)),
        O::DivRegaddress => Instruction::Div(Source::Memory(o.regaddress()?)),
        O::DivAddress => Instruction::Div(Source::Memory(o.address()?)),
        O::DivNumber => Instruction::Div(Source::Immediate(o.byte()?)),

        O::AndRegWithReg => o.logic(LogicOp::And, Mode::Register)?,
        O::AndRegaddressWithReg => o.logic(LogicOp::And, Mode::Indirect)?,
        O::AndAddressWithReg => o.logic(LogicOp::And, Mode::Address)?,
        O::AndNumberWithReg => o.logic(LogicOp::And, Mode::Immediate)?,
        O::OrRegWithReg => o.logic(LogicOp::Or, Mode::Register)?,
        O::OrRegaddressWithReg => o.logic(LogicOp::Or, Mode::Indirect)?,
        O::OrAddressWithReg => o.logic(LogicOp::Or, Mode::Address)?,
        O::OrNumberWithReg => o.logic(LogicOp::Or, Mode::Immediate)?,
        O::XorRegWithReg => o.logic(LogicOp::Xor, Mode::Register)?,
        O::XorRegaddressWithReg => o.logic(LogicOp::Xor, Mode::Indirect)?,
        O::XorAddressWithReg => o.logic(LogicOp::Xor, Mode::Address)?,
        O::XorNumberWithReg => o.logic(LogicOp::Xor, Mode::Immediate)?,
        O::NotReg => Instruction::Not(o.gpr()?),
        O::ShlRegWithReg => o.logic(LogicOp::Shl, Mode::Register)?,
        O::ShlRegaddressWithReg => o.logic(LogicOp::Shl, Mode::Indirect)?,
        O::ShlAddressWithReg => o.logic(LogicOp::Shl, Mode::Address)?,
        O::ShlNumberWithReg => o.logic(LogicOp::Shl, Mode::Immediate)?,
        O::ShrRegWithReg => o.logic(LogicOp::Shr, Mode::Register)?,
        O::ShrRegaddressWithReg => o.logic(LogicOp::Shr, Mode::Indirect)?,
        O::ShrAddressWithReg => o.logic(LogicOp::Shr, Mode::Address)?,
        O::ShrNumberWithReg => o.logic(LogicOp::Shr, Mode::Immediate)?,
    };

    Ok((instr, o.ip + 1))
}

fn jump(cond: Condition, target: Target) -> Instruction {
    Instruction::Jump { cond, target }
}

/// Addressing mode of a narrow source operand.
#[derive(Clone, Copy)]
enum Mode {
    Register,
    Indirect,
    Address,
    Immediate,
}

impl<S: ByteSource + ?Sized> Operands<'_, S> {
    fn narrow_source(&mut self, mode: Mode) -> Result<Source<Gpr>, CpuError> {
        Ok(match mode {
            Mode::Register => Source::Register(self.gpr()?),
            Mode::Indirect => Source::Memory(self.regaddress()?),
            Mode::Address => Source::Memory(self.address()?),
            Mode::Immediate => Source::Immediate(self.byte()?),
        })
    }

    fn logic(&mut self, op: LogicOp, mode: Mode) -> Result<Instruction, CpuError> {
        let dst = self.gpr()?;
        let src = self.narrow_source(mode)?;
        Ok(Instruction::Logic { op, dst, src })
    }
}

/// Encode an instruction to the bytes the assembler would emit.
pub fn encode(instr: &Instruction) -> Vec<u8> {
    let mut bytes = vec![instr.opcode().byte()];

    match *instr {
        Instruction::Halt | Instruction::Ret => {}
        Instruction::Mov { dst, src }
        | Instruction::Add { dst, src }
        | Instruction::Sub { dst, src }
        | Instruction::Cmp { dst, src } => {
            bytes.push(dst.index());
            bytes.push(source_byte(src, Reg::index));
        }
        Instruction::Store { dst, src } => {
            bytes.push(memory_byte(dst));
            bytes.push(match src {
                StoreSource::Register(reg) => reg.index(),
                StoreSource::Immediate(value) => value,
            });
        }
        Instruction::Inc(reg) | Instruction::Dec(reg) => bytes.push(reg.index()),
        Instruction::Mul(src) | Instruction::Div(src) | Instruction::Push(src) => {
            bytes.push(source_byte(src, Gpr::index));
        }
        Instruction::Logic { dst, src, .. } => {
            bytes.push(dst.index());
            bytes.push(source_byte(src, Gpr::index));
        }
        Instruction::Not(gpr) | Instruction::Pop(gpr) => bytes.push(gpr.index()),
        Instruction::Jump { target, .. } | Instruction::Call(target) => {
            bytes.push(match target {
                Target::Register(gpr) => gpr.index(),
                Target::Address(addr) => addr,
            });
        }
    }

    bytes
}

fn memory_byte(mem: MemoryRef) -> u8 {
    match mem {
        MemoryRef::Address(addr) => addr,
        MemoryRef::Indirect(ind) => ind.to_byte(),
    }
}

fn source_byte<R>(src: Source<R>, index: fn(R) -> u8) -> u8 {
    match src {
        Source::Register(reg) => index(reg),
        Source::Memory(mem) => memory_byte(mem),
        Source::Immediate(value) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode_bytes(bytes: &[u8]) -> Result<(Instruction, usize), CpuError> {
        decode(bytes, 0)
    }

    #[test]
    fn test_indirect_operand_decoding() {
        let mut regs = Registers::new();
        regs.set(Gpr::A, 10);

        let ind = Indirect::from_byte(40);
        assert_eq!(ind, Indirect::new(Reg::Gpr(Gpr::A), 5));
        assert_eq!(ind.address(&regs), 15);

        let ind = Indirect::from_byte(200);
        assert_eq!(ind, Indirect::new(Reg::Gpr(Gpr::A), -7));
        assert_eq!(ind.address(&regs), 3);
    }

    #[test]
    fn test_indirect_high_residues_select_sp() {
        for byte in [4u8, 5, 6, 7, 12, 255] {
            assert_eq!(Indirect::from_byte(byte).base, Reg::Sp);
        }
        assert_eq!(Indirect::from_byte(255).offset, -1);
    }

    #[test]
    fn test_indirect_address_can_leave_memory() {
        let regs = Registers::new();
        let ind = Indirect::new(Reg::Gpr(Gpr::B), -16);
        assert_eq!(ind.address(&regs), -16);
    }

    #[test]
    fn test_decode_halt() {
        assert_eq!(decode_bytes(&[0]).unwrap(), (Instruction::Halt, 1));
    }

    #[test]
    fn test_decode_mov_immediate() {
        let (instr, next) = decode_bytes(&[6, 0, 5]).unwrap();
        assert_eq!(instr, Instruction::Mov { dst: Reg::Gpr(Gpr::A), src: Source::Immediate(5) });
        assert_eq!(next, 3);
    }

    #[test]
    fn test_decode_store_operand_order() {
        let (instr, _) = decode_bytes(&[4, 200, 4]).unwrap();
        assert_eq!(
            instr,
            Instruction::Store { dst: MemoryRef::Address(200), src: StoreSource::Register(Reg::Sp) }
        );
    }

    #[test]
    fn test_decode_register_contexts() {
        // MOV accepts SP, PUSH does not.
        assert!(decode_bytes(&[1, 4, 0]).is_ok());
        assert!(matches!(decode_bytes(&[50, 4]), Err(CpuError::InvalidRegister(4))));
        assert!(matches!(decode_bytes(&[1, 5, 0]), Err(CpuError::InvalidRegister(5))));
        assert!(matches!(decode_bytes(&[70, 0, 4]), Err(CpuError::InvalidRegister(4))));
    }

    #[test]
    fn test_decode_invalid_opcode() {
        assert!(matches!(decode_bytes(&[9]), Err(CpuError::InvalidOpcode(9))));
        assert!(matches!(decode_bytes(&[255]), Err(CpuError::InvalidOpcode(255))));
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(
            decode_bytes(&[6, 0]),
            Err(CpuError::Memory(MemoryError::AddressViolation(2)))
        ));
    }

    #[test]
    fn test_decode_jumps() {
        let (instr, next) = decode_bytes(&[41, 17]).unwrap();
        assert_eq!(instr, Instruction::Jump { cond: Condition::Above, target: Target::Address(17) });
        assert_eq!(next, 2);

        let (instr, _) = decode_bytes(&[38, 3]).unwrap();
        assert_eq!(instr, Instruction::Jump { cond: Condition::NotZero, target: Target::Register(Gpr::D) });
    }

    #[test]
    fn test_conditions() {
        let above = Flags { zero: false, carry: false };
        let equal = Flags { zero: true, carry: false };
        let below = Flags { zero: false, carry: true };

        assert!(Condition::Above.holds(above));
        assert!(!Condition::Above.holds(equal));
        assert!(!Condition::Above.holds(below));
        assert!(Condition::NotAbove.holds(equal));
        assert!(Condition::NotAbove.holds(below));
        assert!(Condition::Always.holds(below));
    }

    #[test]
    fn test_encode_matches_table() {
        let store = Instruction::Store {
            dst: MemoryRef::Indirect(Indirect::new(Reg::Gpr(Gpr::D), 0)),
            src: StoreSource::Register(Reg::Gpr(Gpr::A)),
        };
        assert_eq!(encode(&store), vec![5, 3, 0]);

        let cmp = Instruction::Cmp {
            dst: Reg::Gpr(Gpr::B),
            src: Source::Memory(MemoryRef::Indirect(Indirect::new(Reg::Gpr(Gpr::C), 0))),
        };
        assert_eq!(encode(&cmp), vec![21, 1, 2]);

        let shr = Instruction::Logic { op: LogicOp::Shr, dst: Gpr::C, src: Source::Immediate(2) };
        assert_eq!(encode(&shr), vec![97, 2, 2]);
        assert_eq!(shr.size(), 3);
        assert_eq!(Instruction::Ret.size(), 1);
    }

    proptest! {
        #[test]
        fn prop_indirect_byte_roundtrip(byte in any::<u8>()) {
            let ind = Indirect::from_byte(byte);
            prop_assert!((Indirect::MIN_OFFSET..=Indirect::MAX_OFFSET).contains(&ind.offset));
            if byte % 8 < 5 {
                prop_assert_eq!(ind.to_byte(), byte);
            }
        }

        #[test]
        fn prop_encoding_is_decodable(opcode in any::<u8>(), a in 0u8..4, b in any::<u8>()) {
            let bytes = [opcode, a, b];
            if let Ok((instr, next)) = decode_bytes(&bytes) {
                let encoded = encode(&instr);
                prop_assert_eq!(encoded.len(), next);
                prop_assert_eq!(decode_bytes(&encoded).unwrap().0, instr);
            }
        }
    }
}
