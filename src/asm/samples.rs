//! Bundled sample programs.

/// Prints `Hello World!` into the output region.
///
/// ```text
///         JMP start
/// hello:  DB "Hello World!"
///         DB 0
/// start:  MOV C, hello
///         MOV D, 232
///         CALL print
///         HLT
/// print:  PUSH A
///         PUSH B
///         MOV B, 0
/// .loop:  MOV A, [C]
///         MOV [D], A
///         INC C
///         INC D
///         CMP B, [C]
///         JNZ .loop
///         POP B
///         POP A
///         RET
/// ```
pub const HELLO_WORLD: &[u8] = &[
    31, 15,
    b'H', b'e', b'l', b'l', b'o', b' ', b'W', b'o', b'r', b'l', b'd', b'!', 0,
    6, 2, 2,
    6, 3, 232,
    56, 24,
    0,
    50, 0,
    50, 1,
    6, 1, 0,
    3, 0, 2,
    5, 3, 0,
    18, 2,
    18, 3,
    21, 1, 2,
    39, 31,
    54, 1,
    54, 0,
    57,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::disassemble_at;

    #[test]
    fn test_labels_line_up() {
        assert_eq!(HELLO_WORLD.len(), 51);
        assert_eq!(disassemble_at(HELLO_WORLD, 15).0, "MOV C, 2");
        assert_eq!(disassemble_at(HELLO_WORLD, 23).0, "HLT");
        assert_eq!(disassemble_at(HELLO_WORLD, 24).0, "PUSH A");
        assert_eq!(disassemble_at(HELLO_WORLD, 31).0, "MOV A, [C]");
        assert_eq!(disassemble_at(HELLO_WORLD, 50).0, "RET");
    }
}
