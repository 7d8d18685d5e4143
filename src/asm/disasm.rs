//! Disassembler.
//!
//! Converts encoded instructions back to readable assembly.

use crate::cpu::{decode, ByteSource, Gpr, Indirect, Instruction, MemoryRef, Reg, Source, StoreSource, Target};

/// Format a value as decimal or as two upper-case hex digits.
pub fn format_value(value: u8, hex: bool) -> String {
    if hex {
        format!("{:02X}", value)
    } else {
        value.to_string()
    }
}

/// Format an address, which may sit one past the last cell, as decimal
/// or upper-case hex.
pub fn format_address(address: usize, hex: bool) -> String {
    if hex {
        format!("{:02X}", address)
    } else {
        format!("{:03}", address)
    }
}

/// Disassemble the instruction at `address`.
///
/// Returns the text and the number of bytes consumed. Bytes that do not
/// decode are shown as `DB` data and consume one byte.
pub fn disassemble_at<S: ByteSource + ?Sized>(source: &S, address: usize) -> (String, usize) {
    match decode(source, address) {
        Ok((instr, next)) => (format_instruction(&instr), next - address),
        Err(_) => match source.fetch(address as i32) {
            Ok(byte) => (format!("DB {}", byte), 1),
            Err(_) => ("???".to_string(), 1),
        },
    }
}

/// Disassemble a program image into a listing.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; Disassembly\n");
    output.push_str("; -----------\n\n");

    let mut addr = 0;
    while addr < bytes.len() {
        let (line, size) = disassemble_at(bytes, addr);
        let end = (addr + size).min(bytes.len());
        let raw: Vec<String> = bytes[addr..end].iter().map(|b| format!("{:02X}", b)).collect();
        output.push_str(&format!("{:03}: {:<16} ; {}\n", addr, line, raw.join(" ")));
        addr += size;
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    let mnemonic = instr.opcode().mnemonic();

    match *instr {
        Instruction::Halt | Instruction::Ret => mnemonic.to_string(),
        Instruction::Mov { dst, src }
        | Instruction::Add { dst, src }
        | Instruction::Sub { dst, src }
        | Instruction::Cmp { dst, src } => {
            format!("{} {}, {}", mnemonic, dst.name(), format_source(src, Reg::name))
        }
        Instruction::Store { dst, src } => {
            let value = match src {
                StoreSource::Register(reg) => reg.name().to_string(),
                StoreSource::Immediate(value) => value.to_string(),
            };
            format!("{} {}, {}", mnemonic, format_memory(dst), value)
        }
        Instruction::Inc(reg) | Instruction::Dec(reg) => format!("{} {}", mnemonic, reg.name()),
        Instruction::Mul(src) | Instruction::Div(src) | Instruction::Push(src) => {
            format!("{} {}", mnemonic, format_source(src, Gpr::name))
        }
        Instruction::Logic { dst, src, .. } => {
            format!("{} {}, {}", mnemonic, dst.name(), format_source(src, Gpr::name))
        }
        Instruction::Not(gpr) | Instruction::Pop(gpr) => format!("{} {}", mnemonic, gpr.name()),
        Instruction::Jump { target, .. } | Instruction::Call(target) => match target {
            Target::Register(gpr) => format!("{} {}", mnemonic, gpr.name()),
            Target::Address(addr) => format!("{} {}", mnemonic, addr),
        },
    }
}

fn format_source<R: Copy>(src: Source<R>, name: fn(R) -> &'static str) -> String {
    match src {
        Source::Register(reg) => name(reg).to_string(),
        Source::Memory(mem) => format_memory(mem),
        Source::Immediate(value) => value.to_string(),
    }
}

fn format_memory(mem: MemoryRef) -> String {
    match mem {
        MemoryRef::Address(addr) => format!("[{}]", addr),
        MemoryRef::Indirect(Indirect { base, offset }) => match offset {
            0 => format!("[{}]", base.name()),
            o if o > 0 => format!("[{}+{}]", base.name(), o),
            o => format!("[{}{}]", base.name(), o),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{encode, Condition, LogicOp};

    fn text(bytes: &[u8]) -> String {
        disassemble_at(bytes, 0).0
    }

    #[test]
    fn test_disassemble_hlt() {
        assert_eq!(text(&[0]), "HLT");
        assert_eq!(text(&[57]), "RET");
    }

    #[test]
    fn test_disassemble_mov_forms() {
        assert_eq!(text(&[1, 0, 4]), "MOV A, SP");
        assert_eq!(text(&[2, 1, 12]), "MOV B, [12]");
        assert_eq!(text(&[3, 0, 2]), "MOV A, [C]");
        assert_eq!(text(&[3, 0, 18]), "MOV A, [C+2]");
        assert_eq!(text(&[6, 3, 232]), "MOV D, 232");
        assert_eq!(text(&[5, 3, 0]), "MOV [D], A");
        assert_eq!(text(&[8, 236, 7]), "MOV [SP-3], 7");
    }

    #[test]
    fn test_disassemble_control_flow() {
        assert_eq!(text(&[39, 31]), "JNZ 31");
        assert_eq!(text(&[30, 2]), "JMP C");
        assert_eq!(text(&[56, 24]), "CALL 24");
        assert_eq!(text(&[53, 65]), "PUSH 65");
    }

    #[test]
    fn test_disassemble_at_sizes() {
        assert_eq!(disassemble_at(&[6u8, 0, 1][..], 0).1, 3);
        assert_eq!(disassemble_at(&[18u8, 0][..], 0).1, 2);
        assert_eq!(disassemble_at(&[57u8][..], 0).1, 1);
    }

    #[test]
    fn test_undecodable_bytes_are_data() {
        assert_eq!(disassemble_at(&[9u8][..], 0), ("DB 9".to_string(), 1));
        assert_eq!(disassemble_at(&[1u8, 7, 0][..], 0), ("DB 1".to_string(), 1));
        assert_eq!(disassemble_at(&[6u8, 0][..], 0), ("DB 6".to_string(), 1));
    }

    #[test]
    fn test_format_matches_encoding() {
        let instr = Instruction::Logic {
            op: LogicOp::Xor,
            dst: Gpr::B,
            src: Source::Immediate(255),
        };
        assert_eq!(text(&encode(&instr)), "XOR B, 255");

        let instr = Instruction::Jump { cond: Condition::NotAbove, target: Target::Address(7) };
        assert_eq!(format_instruction(&instr), "JNA 7");
    }

    #[test]
    fn test_listing() {
        let listing = disassemble(&[6, 0, 1, 0]);
        assert!(listing.contains("000: MOV A, 1"));
        assert!(listing.contains("003: HLT"));
        assert!(listing.contains("06 00 01"));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(42, false), "42");
        assert_eq!(format_value(42, true), "2A");
        assert_eq!(format_value(5, true), "05");
    }

    #[test]
    fn test_format_address() {
        assert_eq!(format_address(7, false), "007");
        assert_eq!(format_address(231, true), "E7");
        assert_eq!(format_address(256, true), "100");
    }
}
