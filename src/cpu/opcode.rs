//! The opcode table.
//!
//! These byte values are a hard contract with the assembler and
//! disassembler; programs assembled elsewhere must run unchanged.

use serde::{Serialize, Deserialize};

/// Every opcode byte the CPU understands.
///
/// The naming follows the assembler's table: `REG` is a register operand,
/// `REGADDRESS` a register-indirect operand, `ADDRESS` a direct memory
/// address and `NUMBER` an immediate byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    None = 0,

    MovRegToReg = 1,
    MovAddressToReg = 2,
    MovRegaddressToReg = 3,
    MovRegToAddress = 4,
    MovRegToRegaddress = 5,
    MovNumberToReg = 6,
    MovNumberToAddress = 7,
    MovNumberToRegaddress = 8,

    AddRegToReg = 10,
    AddRegaddressToReg = 11,
    AddAddressToReg = 12,
    AddNumberToReg = 13,
    SubRegFromReg = 14,
    SubRegaddressFromReg = 15,
    SubAddressFromReg = 16,
    SubNumberFromReg = 17,
    IncReg = 18,
    DecReg = 19,
    CmpRegWithReg = 20,
    CmpRegaddressWithReg = 21,
    CmpAddressWithReg = 22,
    CmpNumberWithReg = 23,

    JmpRegaddress = 30,
    JmpAddress = 31,
    JcRegaddress = 32,
    JcAddress = 33,
    JncRegaddress = 34,
    JncAddress = 35,
    JzRegaddress = 36,
    JzAddress = 37,
    JnzRegaddress = 38,
    JnzAddress = 39,
    JaRegaddress = 40,
    JaAddress = 41,
    JnaRegaddress = 42,
    JnaAddress = 43,

    PushReg = 50,
    PushRegaddress = 51,
    PushAddress = 52,
    PushNumber = 53,
    PopReg = 54,
    CallRegaddress = 55,
    CallAddress = 56,
    Ret = 57,

    MulReg = 60,
    MulRegaddress = 61,
    MulAddress = 62,
    MulNumber = 63,
    DivReg = 64,
    DivRegaddress = 65,
    DivAddress = 66,
    DivNumber = 67,

    AndRegWithReg = 70,
    AndRegaddressWithReg = 71,
    AndAddressWithReg = 72,
    AndNumberWithReg = 73,
    OrRegWithReg = 74,
    OrRegaddressWithReg = 75,
    OrAddressWithReg = 76,
    OrNumberWithReg = 77,
    XorRegWithReg = 78,
    XorRegaddressWithReg = 79,
    XorAddressWithReg = 80,
    XorNumberWithReg = 81,
    NotReg = 82,

    ShlRegWithReg = 90,
    ShlRegaddressWithReg = 91,
    ShlAddressWithReg = 92,
    ShlNumberWithReg = 93,
    ShrRegWithReg = 94,
    ShrRegaddressWithReg = 95,
    ShrAddressWithReg = 96,
    ShrNumberWithReg = 97,
}

impl Opcode {
    /// Every opcode, in table order.
    pub const ALL: [Opcode; 74] = [
        Opcode::None,
        Opcode::MovRegToReg,
        Opcode::MovAddressToReg,
        Opcode::MovRegaddressToReg,
        Opcode::MovRegToAddress,
        Opcode::MovRegToRegaddress,
        Opcode::MovNumberToReg,
        Opcode::MovNumberToAddress,
        Opcode::MovNumberToRegaddress,
        Opcode::AddRegToReg,
        Opcode::AddRegaddressToReg,
        Opcode::AddAddressToReg,
        Opcode::AddNumberToReg,
        Opcode::SubRegFromReg,
        Opcode::SubRegaddressFromReg,
        Opcode::SubAddressFromReg,
        Opcode::SubNumberFromReg,
        Opcode::IncReg,
        Opcode::DecReg,
        Opcode::CmpRegWithReg,
        Opcode::CmpRegaddressWithReg,
        Opcode::CmpAddressWithReg,
        Opcode::CmpNumberWithReg,
        Opcode::JmpRegaddress,
        Opcode::JmpAddress,
        Opcode::JcRegaddress,
        Opcode::JcAddress,
        Opcode::JncRegaddress,
        Opcode::JncAddress,
        Opcode::JzRegaddress,
        Opcode::JzAddress,
        Opcode::JnzRegaddress,
        Opcode::JnzAddress,
        Opcode::JaRegaddress,
        Opcode::JaAddress,
        Opcode::JnaRegaddress,
        Opcode::JnaAddress,
        Opcode::PushReg,
        Opcode::PushRegaddress,
        Opcode::PushAddress,
        Opcode::PushNumber,
        Opcode::PopReg,
        Opcode::CallRegaddress,
        Opcode::CallAddress,
        Opcode::Ret,
        Opcode::MulReg,
        Opcode::MulRegaddress,
        Opcode::MulAddress,
        Opcode::MulNumber,
        Opcode::DivReg,
        Opcode::DivRegaddress,
        Opcode::DivAddress,
        Opcode::DivNumber,
        Opcode::AndRegWithReg,
        Opcode::AndRegaddressWithReg,
        Opcode::AndAddressWithReg,
        Opcode::AndNumberWithReg,
        Opcode::OrRegWithReg,
        Opcode::OrRegaddressWithReg,
        Opcode::OrAddressWithReg,
        Opcode::OrNumberWithReg,
        Opcode::XorRegWithReg,
        Opcode::XorRegaddressWithReg,
        Opcode::XorAddressWithReg,
        Opcode::XorNumberWithReg,
        Opcode::NotReg,
        Opcode::ShlRegWithReg,
        Opcode::ShlRegaddressWithReg,
        Opcode::ShlAddressWithReg,
        Opcode::ShlNumberWithReg,
        Opcode::ShrRegWithReg,
        Opcode::ShrRegaddressWithReg,
        Opcode::ShrAddressWithReg,
        Opcode::ShrNumberWithReg,
    ];

    /// Look up an opcode byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        use Opcode::*;

        let op = match byte {
            0 => None,
            1 => MovRegToReg,
            2 => MovAddressToReg,
            3 => MovRegaddressToReg,
            4 => MovRegToAddress,
            5 => MovRegToRegaddress,
            6 => MovNumberToReg,
            7 => MovNumberToAddress,
            8 => MovNumberToRegaddress,
            10 => AddRegToReg,
            11 => AddRegaddressToReg,
            12 => AddAddressToReg,
            13 => AddNumberToReg,
            14 => SubRegFromReg,
            15 => SubRegaddressFromReg,
            16 => SubAddressFromReg,
            17 => SubNumberFromReg,
            18 => IncReg,
            19 => DecReg,
            20 => CmpRegWithReg,
            21 => CmpRegaddressWithReg,
            22 => CmpAddressWithReg,
            23 => CmpNumberWithReg,
            30 => JmpRegaddress,
            31 => JmpAddress,
            32 => JcRegaddress,
            33 => JcAddress,
            34 => JncRegaddress,
            35 => JncAddress,
            36 => JzRegaddress,
            37 => JzAddress,
            38 => JnzRegaddress,
            39 => JnzAddress,
            40 => JaRegaddress,
            41 => JaAddress,
            42 => JnaRegaddress,
            43 => JnaAddress,
            50 => PushReg,
            51 => PushRegaddress,
            52 => PushAddress,
            53 => PushNumber,
            54 => PopReg,
            55 => CallRegaddress,
            56 => CallAddress,
            57 => Ret,
            60 => MulReg,
            61 => MulRegaddress,
            62 => MulAddress,
            63 => MulNumber,
            64 => DivReg,
            65 => DivRegaddress,
            66 => DivAddress,
            67 => DivNumber,
            70 => AndRegWithReg,
            71 => AndRegaddressWithReg,
            72 => AndAddressWithReg,
            73 => AndNumberWithReg,
            74 => OrRegWithReg,
            75 => OrRegaddressWithReg,
            76 => OrAddressWithReg,
            77 => OrNumberWithReg,
            78 => XorRegWithReg,
            79 => XorRegaddressWithReg,
            80 => XorAddressWithReg,
            81 => XorNumberWithReg,
            82 => NotReg,
            90 => ShlRegWithReg,
            91 => ShlRegaddressWithReg,
            92 => ShlAddressWithReg,
            93 => ShlNumberWithReg,
            94 => ShrRegWithReg,
            95 => ShrRegaddressWithReg,
            96 => ShrAddressWithReg,
            97 => ShrNumberWithReg,
            _ => return Option::None,
        };

        Some(op)
    }

    /// The byte this opcode is encoded as.
    #[inline]
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Number of operand bytes following the opcode.
    pub fn operand_count(self) -> usize {
        use Opcode::*;

        match self {
            None | Ret => 0,
            IncReg | DecReg | NotReg | PushReg | PushRegaddress | PushAddress | PushNumber
            | PopReg | CallRegaddress | CallAddress | MulReg | MulRegaddress | MulAddress
            | MulNumber | DivReg | DivRegaddress | DivAddress | DivNumber => 1,
            JmpRegaddress | JmpAddress | JcRegaddress | JcAddress | JncRegaddress
            | JncAddress | JzRegaddress | JzAddress | JnzRegaddress | JnzAddress
            | JaRegaddress | JaAddress | JnaRegaddress | JnaAddress => 1,
            _ => 2,
        }
    }

    /// Assembler mnemonic.
    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;

        match self {
            None => "HLT",
            MovRegToReg | MovAddressToReg | MovRegaddressToReg | MovRegToAddress
            | MovRegToRegaddress | MovNumberToReg | MovNumberToAddress
            | MovNumberToRegaddress => "MOV",
            AddRegToReg | AddRegaddressToReg | AddAddressToReg | AddNumberToReg => "ADD",
            SubRegFromReg | SubRegaddressFromReg | SubAddressFromReg | SubNumberFromReg => "SUB",
            IncReg => "INC",
            DecReg => "DEC",
            CmpRegWithReg | CmpRegaddressWithReg | CmpAddressWithReg | CmpNumberWithReg => "CMP",
            JmpRegaddress | JmpAddress => "JMP",
            JcRegaddress | JcAddress => "JC",
            JncRegaddress | JncAddress => "JNC",
            JzRegaddress | JzAddress => "JZ",
            JnzRegaddress | JnzAddress => "JNZ",
            JaRegaddress | JaAddress => "JA",
            JnaRegaddress | JnaAddress => "JNA",
            PushReg | PushRegaddress | PushAddress | PushNumber => "PUSH",
            PopReg => "POP",
            CallRegaddress | CallAddress => "CALL",
            Ret => "RET",
            MulReg | MulRegaddress | MulAddress | MulNumber => "MUL",
            DivReg | DivRegaddress | DivAddress | DivNumber => "DIV",
            AndRegWithReg | AndRegaddressWithReg | AndAddressWithReg | AndNumberWithReg => "AND",
            OrRegWithReg | OrRegaddressWithReg | OrAddressWithReg | OrNumberWithReg => "OR",
            XorRegWithReg | XorRegaddressWithReg | XorAddressWithReg | XorNumberWithReg => "XOR",
            NotReg => "NOT",
            ShlRegWithReg | ShlRegaddressWithReg | ShlAddressWithReg | ShlNumberWithReg => "SHL",
            ShrRegWithReg | ShrRegaddressWithReg | ShrAddressWithReg | ShrNumberWithReg => "SHR",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Opcode::from_byte(byte).ok_or(byte)
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        op.byte()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_consistent() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_byte(op.byte()), Some(op));
        }

        let known = (0..=u8::MAX).filter_map(Opcode::from_byte).count();
        assert_eq!(known, Opcode::ALL.len());
    }

    #[test]
    fn test_fixed_values() {
        assert_eq!(Opcode::None.byte(), 0);
        assert_eq!(Opcode::MovNumberToReg.byte(), 6);
        assert_eq!(Opcode::JmpAddress.byte(), 31);
        assert_eq!(Opcode::CallAddress.byte(), 56);
        assert_eq!(Opcode::Ret.byte(), 57);
        assert_eq!(Opcode::ShrNumberWithReg.byte(), 97);
    }

    #[test]
    fn test_unknown_bytes() {
        for byte in [9u8, 24, 29, 44, 49, 58, 68, 83, 89, 98, 255] {
            assert_eq!(Opcode::try_from(byte), Err(byte));
        }
    }

    #[test]
    fn test_operand_counts() {
        assert_eq!(Opcode::None.operand_count(), 0);
        assert_eq!(Opcode::Ret.operand_count(), 0);
        assert_eq!(Opcode::IncReg.operand_count(), 1);
        assert_eq!(Opcode::JnaAddress.operand_count(), 1);
        assert_eq!(Opcode::MovNumberToRegaddress.operand_count(), 2);
        assert_eq!(Opcode::ShlNumberWithReg.operand_count(), 2);
    }
}
