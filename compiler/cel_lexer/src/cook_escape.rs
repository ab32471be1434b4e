//! Decodes the full body of a string or bytes literal (quotes and
//! `r`/`b` prefix already stripped by the caller).
//!
//! Raw literals (`r"..."`) never interpret escapes — the backslash is
//! literal — so the octal/unicode-disallowed-in-raw rule holds trivially:
//! those productions simply do not exist when `raw` is set. Non-raw
//! literals normalise `\r\n` and lone `\r` to `\n` before/while decoding
//! escapes; raw literals keep line endings verbatim.

use crate::escape::{decode_escape, EscapeValue};

/// One decode failure, with the byte offset (within the literal body)
/// of the backslash that introduced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookError {
    pub body_offset: u32,
    pub message: String,
}

pub fn cook_string(body: &str, raw: bool) -> Result<String, Vec<CookError>> {
    if raw {
        return Ok(body.to_string());
    }

    let mut out = String::with_capacity(body.len());
    let mut errors = Vec::new();
    let mut chars = body.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '\r' => {
                if matches!(chars.peek(), Some((_, '\n'))) {
                    chars.next();
                }
                out.push('\n');
            }
            '\\' => match decode_escape(&mut chars, false) {
                Ok(EscapeValue::Byte(b)) => out.push(b as char),
                Ok(EscapeValue::CodePoint(cp)) => {
                    if let Some(ch) = char::from_u32(cp) {
                        out.push(ch);
                    } else {
                        errors.push(CookError {
                            body_offset: u32::try_from(idx).unwrap_or(u32::MAX),
                            message: "escape does not encode a valid code point".to_string(),
                        });
                    }
                }
                Err(e) => errors.push(CookError {
                    body_offset: u32::try_from(idx).unwrap_or(u32::MAX),
                    message: e.message,
                }),
            },
            other => out.push(other),
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(errors)
    }
}

pub fn cook_bytes(body: &str, raw: bool) -> Result<Vec<u8>, Vec<CookError>> {
    if raw {
        return Ok(body.as_bytes().to_vec());
    }

    let mut out = Vec::with_capacity(body.len());
    let mut errors = Vec::new();
    let mut chars = body.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '\r' => {
                if matches!(chars.peek(), Some((_, '\n'))) {
                    chars.next();
                }
                out.push(b'\n');
            }
            '\\' => match decode_escape(&mut chars, true) {
                Ok(EscapeValue::Byte(b)) => out.push(b),
                Ok(EscapeValue::CodePoint(_)) => unreachable!("bytes mode never yields a code point"),
                Err(e) => errors.push(CookError {
                    body_offset: u32::try_from(idx).unwrap_or(u32::MAX),
                    message: e.message,
                }),
            },
            other => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_string_is_untouched() {
        assert_eq!(cook_string(r"a\nb", true).unwrap(), r"a\nb");
    }

    #[test]
    fn simple_escapes_decode() {
        assert_eq!(cook_string(r"a\nb", false).unwrap(), "a\nb");
        assert_eq!(cook_string(r"\`ok\`", false).unwrap(), "`ok`");
    }

    #[test]
    fn crlf_and_lone_cr_normalise_to_lf() {
        assert_eq!(cook_string("a\r\nb", false).unwrap(), "a\nb");
        assert_eq!(cook_string("a\rb", false).unwrap(), "a\nb");
    }

    #[test]
    fn raw_mode_keeps_line_endings_verbatim() {
        assert_eq!(cook_string("a\r\nb", true).unwrap(), "a\r\nb");
    }

    #[test]
    fn unicode_escape_builds_code_point() {
        assert_eq!(cook_string("\\u00e9", false).unwrap(), "\u{e9}");
    }

    #[test]
    fn bytes_body_encodes_direct_unicode_as_utf8() {
        assert_eq!(cook_bytes("é", false).unwrap(), "é".as_bytes());
    }

    #[test]
    fn bytes_rejects_unicode_escape() {
        assert!(cook_bytes("\\u00e9", false).is_err());
    }

    #[test]
    fn invalid_escape_is_reported_with_offset() {
        let err = cook_string(r"ok\qbad", false).unwrap_err();
        assert_eq!(err[0].body_offset, 2);
    }
}
