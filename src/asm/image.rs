//! Program image files.
//!
//! Two formats are understood:
//! - Raw binary: bytes are loaded verbatim.
//! - Hex text (`.hex`): whitespace or comma separated byte tokens such as
//!   `2A` or `0x2A`. Text after `;` is a comment and blank lines are ignored.

use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Bytes written per line by [`format_hex`].
const BYTES_PER_LINE: usize = 16;

/// Load a program image from disk, picking the format from the extension.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, ImageError> {
    let path = path.as_ref();

    if is_hex_path(path) {
        let text = std::fs::read_to_string(path).map_err(|e| ImageError::Io(e.to_string()))?;
        parse_hex(&text)
    } else {
        std::fs::read(path).map_err(|e| ImageError::Io(e.to_string()))
    }
}

/// Whether `path` names a hex text image.
pub fn is_hex_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("hex"))
        .unwrap_or(false)
}

/// Parse hex text into bytes.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, ImageError> {
    let mut bytes = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let code = line.split(';').next().unwrap_or("");

        for token in code.split(|c: char| c.is_whitespace() || c == ',') {
            if token.is_empty() {
                continue;
            }

            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);

            if digits.is_empty() || digits.len() > 2 {
                return Err(ImageError::Parse {
                    line: line_num + 1,
                    message: format!("expected a byte, found `{}`", token),
                });
            }

            let byte = u8::from_str_radix(digits, 16).map_err(|_| ImageError::Parse {
                line: line_num + 1,
                message: format!("invalid hex byte `{}`", token),
            })?;

            bytes.push(byte);
        }
    }

    Ok(bytes)
}

/// Format bytes as hex text, 16 per line with an address comment.
pub fn format_hex(bytes: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; Program image\n");
    output.push_str(&format!("; {} bytes\n\n", bytes.len()));

    for (i, chunk) in bytes.chunks(BYTES_PER_LINE).enumerate() {
        let line: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        output.push_str(&format!("{} ; {:03}\n", line.join(" "), i * BYTES_PER_LINE));
    }

    output
}

/// Save bytes to disk as hex text.
pub fn save_hex<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), ImageError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| ImageError::Io(e.to_string()))?;

    file.write_all(format_hex(bytes).as_bytes())
        .map_err(|e| ImageError::Io(e.to_string()))
}

/// Errors that can occur while reading or writing images.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::samples::HELLO_WORLD;

    #[test]
    fn test_parse_tokens() {
        let bytes = parse_hex("06 00 2a ; MOV A, 42\n0x00,ff\n\n; done\n").unwrap();
        assert_eq!(bytes, vec![6, 0, 42, 0, 255]);
    }

    #[test]
    fn test_parse_error_has_line() {
        let err = parse_hex("00\n01 zz\n").unwrap_err();
        assert!(matches!(err, ImageError::Parse { line: 2, .. }));

        let err = parse_hex("123\n").unwrap_err();
        assert!(matches!(err, ImageError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_format_hex_layout() {
        let text = format_hex(&[0u8; 20]);
        assert!(text.contains("; 000\n"));
        assert!(text.contains("00 00 00 00 ; 016\n"));
    }

    #[test]
    fn test_hex_text_reloads() {
        assert_eq!(parse_hex(&format_hex(HELLO_WORLD)).unwrap(), HELLO_WORLD);
    }

    #[test]
    fn test_hex_extension() {
        assert!(is_hex_path(Path::new("prog.hex")));
        assert!(is_hex_path(Path::new("PROG.HEX")));
        assert!(!is_hex_path(Path::new("prog.bin")));
        assert!(!is_hex_path(Path::new("prog")));
    }
}
