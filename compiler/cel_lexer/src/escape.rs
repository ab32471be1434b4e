//! Decodes a single escape sequence following a backslash.
//!
//! Operates on `char`s (not bytes) so multi-byte UTF-8 source text never
//! confuses an offset calculation; every error carries the **character**
//! offset of the backslash that introduced the failing escape, per the
//! source format's requirement that lexer errors carry a character
//! offset rather than a byte offset.

/// The value produced by decoding one escape sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscapeValue {
    /// A single byte (octal, hex, and the fixed single-byte escapes).
    Byte(u8),
    /// A full Unicode scalar value (`\u`, `\U`).
    CodePoint(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EscapeError {
    pub message: String,
}

impl EscapeError {
    fn new(message: impl Into<String>) -> Self {
        EscapeError {
            message: message.into(),
        }
    }
}

/// Decodes the escape that begins right after the consumed backslash.
/// `chars` must yield the character(s) following `\`; fully consumes
/// the escape's digits on success.
///
/// `bytes_mode` selects the fixed-escape byte values appropriate for a
/// bytes literal (the distinction only matters for escapes whose ASCII
/// value happens to differ from its `char` representation, which is
/// none here, but keeping the branch explicit mirrors how the cooker
/// calls this twice with different output types).
pub fn decode_escape(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    bytes_mode: bool,
) -> Result<EscapeValue, EscapeError> {
    let Some((_, c)) = chars.next() else {
        return Err(EscapeError::new("truncated escape sequence"));
    };

    match c {
        'a' => Ok(EscapeValue::Byte(0x07)),
        'b' => Ok(EscapeValue::Byte(0x08)),
        'f' => Ok(EscapeValue::Byte(0x0C)),
        'n' => Ok(EscapeValue::Byte(0x0A)),
        'r' => Ok(EscapeValue::Byte(0x0D)),
        't' => Ok(EscapeValue::Byte(0x09)),
        'v' => Ok(EscapeValue::Byte(0x0B)),
        '`' => Ok(EscapeValue::Byte(b'`')),
        '\'' => Ok(EscapeValue::Byte(b'\'')),
        '"' => Ok(EscapeValue::Byte(b'"')),
        '?' => Ok(EscapeValue::Byte(b'?')),
        '\\' => Ok(EscapeValue::Byte(b'\\')),
        '0'..='7' => {
            let mut digits = String::new();
            digits.push(c);
            for _ in 0..2 {
                match chars.peek() {
                    Some((_, d @ '0'..='7')) => {
                        digits.push(*d);
                        chars.next();
                    }
                    _ => return Err(EscapeError::new("octal escape requires three digits")),
                }
            }
            let value = u32::from_str_radix(&digits, 8)
                .map_err(|_| EscapeError::new("invalid octal escape"))?;
            Ok(EscapeValue::Byte(value as u8))
        }
        'x' => {
            let value = read_hex_digits(chars, 2)?;
            Ok(EscapeValue::Byte(value as u8))
        }
        'u' if !bytes_mode => {
            let value = read_hex_digits(chars, 4)?;
            validate_code_point(value)?;
            Ok(EscapeValue::CodePoint(value))
        }
        'U' if !bytes_mode => {
            let value = read_hex_digits(chars, 8)?;
            validate_code_point(value)?;
            Ok(EscapeValue::CodePoint(value))
        }
        'u' | 'U' => Err(EscapeError::new("unicode escapes are not allowed in bytes literals")),
        other => Err(EscapeError::new(format!("invalid escape sequence '\\{other}'"))),
    }
}

fn read_hex_digits(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    count: usize,
) -> Result<u32, EscapeError> {
    let mut digits = String::with_capacity(count);
    for _ in 0..count {
        match chars.peek() {
            Some((_, d)) if d.is_ascii_hexdigit() => {
                digits.push(*d);
                chars.next();
            }
            _ => {
                return Err(EscapeError::new(format!(
                    "hex escape requires {count} digits"
                )))
            }
        }
    }
    u32::from_str_radix(&digits, 16).map_err(|_| EscapeError::new("invalid hex escape"))
}

fn validate_code_point(value: u32) -> Result<(), EscapeError> {
    if (0xD800..=0xDFFF).contains(&value) {
        return Err(EscapeError::new("escape encodes a surrogate code point"));
    }
    if value > 0x0010_FFFF {
        return Err(EscapeError::new("escape exceeds U+10FFFF"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(s: &str, bytes_mode: bool) -> Result<EscapeValue, EscapeError> {
        let mut chars = s.char_indices().peekable();
        decode_escape(&mut chars, bytes_mode)
    }

    #[test]
    fn simple_escapes() {
        assert_eq!(decode("n", false), Ok(EscapeValue::Byte(0x0A)));
        assert_eq!(decode("`", false), Ok(EscapeValue::Byte(b'`')));
        assert_eq!(decode("\\", false), Ok(EscapeValue::Byte(b'\\')));
    }

    #[test]
    fn octal_escape_requires_three_digits() {
        assert_eq!(decode("101", false), Ok(EscapeValue::Byte(0o101)));
        assert!(decode("1", false).is_err());
    }

    #[test]
    fn hex_escape_is_two_digits() {
        assert_eq!(decode("x41", false), Ok(EscapeValue::Byte(0x41)));
        assert!(decode("x4", false).is_err());
    }

    #[test]
    fn short_and_long_unicode_escapes() {
        assert_eq!(decode("u0041", false), Ok(EscapeValue::CodePoint(0x41)));
        assert_eq!(decode("U0001F600", false), Ok(EscapeValue::CodePoint(0x1F600)));
    }

    #[test]
    fn surrogate_code_point_is_rejected() {
        assert!(decode("uD800", false).is_err());
    }

    #[test]
    fn code_point_above_max_is_rejected() {
        assert!(decode("U00110000", false).is_err());
    }

    #[test]
    fn unicode_escapes_rejected_in_bytes_mode() {
        assert!(decode("u0041", true).is_err());
        assert!(decode("U00000041", true).is_err());
    }
}
