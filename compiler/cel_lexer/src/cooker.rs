//! Cooks a raw token stream into [`Token`]s: computes spans, interns
//! identifiers, resolves literal keywords, and decodes literal bodies
//! into [`Constant`] values.

use cel_diagnostic::{Diagnostic, ErrorCode, IssueCollector};
use cel_ir::{Constant, Span, StringInterner};
use cel_lexer_core::{tokenize, RawTag, SourceBuffer};

use crate::cook_escape::{cook_bytes, cook_string};
use crate::keywords::{literal_keyword, LiteralKeyword};
use crate::token::{Token, TokenKind};

/// Lexes `source` into a token stream, interning identifiers into
/// `interner`. Trivia (whitespace, comments) is dropped; diagnostics for
/// malformed literals and invalid bytes are pushed into the returned
/// collector. Lexing never aborts early: a bad token becomes an error
/// diagnostic and an `Eof`-adjacent placeholder is not inserted, so
/// downstream callers should check `issues.has_errors()` before trusting
/// the token stream for anything beyond error recovery.
#[must_use]
pub fn lex(source: &str, interner: &mut StringInterner) -> (Vec<Token>, IssueCollector) {
    let buf = SourceBuffer::new(source);
    let mut issues = IssueCollector::new();

    for issue in buf.encoding_issues() {
        use cel_lexer_core::EncodingIssueKind as K;
        let span = Span::new(issue.pos, issue.pos + issue.len);
        let message = match issue.kind {
            K::Utf8Bom => "source must not start with a UTF-8 byte-order mark".to_string(),
            K::Utf16LeBom => "source is UTF-16 (little-endian); CEL source must be UTF-8".to_string(),
            K::Utf16BeBom => "source is UTF-16 (big-endian); CEL source must be UTF-8".to_string(),
            K::InteriorNull => "source contains a NUL byte".to_string(),
        };
        issues.push(Diagnostic::error(ErrorCode::E0002, message, span));
    }

    let raw_tokens = tokenize(&buf);
    let mut tokens = Vec::with_capacity(raw_tokens.len());
    let mut pos: u32 = 0;

    for raw in raw_tokens {
        let start = pos;
        let end = start + raw.len;
        let span = Span::new(start, end);
        pos = end;

        if raw.tag.is_trivia() {
            continue;
        }

        let text = &source[start as usize..end as usize];

        let kind = match raw.tag {
            RawTag::Eof => TokenKind::Eof,
            RawTag::Ident => cook_ident(text, interner),
            RawTag::Int => match cook_int(text) {
                Ok(c) => TokenKind::Constant(c),
                Err(msg) => {
                    issues.push(Diagnostic::error(ErrorCode::E0003, msg, span));
                    continue;
                }
            },
            RawTag::HexInt => match cook_hex_int(text) {
                Ok(c) => TokenKind::Constant(c),
                Err(msg) => {
                    issues.push(Diagnostic::error(ErrorCode::E0003, msg, span));
                    continue;
                }
            },
            RawTag::Float => match text.parse::<f64>() {
                Ok(v) => TokenKind::Constant(Constant::Double(v)),
                Err(_) => {
                    issues.push(Diagnostic::error(
                        ErrorCode::E0003,
                        format!("invalid float literal '{text}'"),
                        span,
                    ));
                    continue;
                }
            },
            RawTag::String => match cook_string_literal(text, start, &mut issues) {
                Some(c) => TokenKind::Constant(c),
                None => continue,
            },
            RawTag::Bytes => match cook_bytes_literal(text, start, &mut issues) {
                Some(c) => TokenKind::Constant(c),
                None => continue,
            },
            RawTag::UnterminatedString | RawTag::UnterminatedBytes => {
                issues.push(Diagnostic::error(
                    ErrorCode::E0001,
                    "unterminated string or bytes literal",
                    span,
                ));
                continue;
            }
            RawTag::InteriorNull => continue,
            RawTag::InvalidByte => {
                issues.push(Diagnostic::error(
                    ErrorCode::E0002,
                    format!("invalid character '{text}' in source"),
                    span,
                ));
                continue;
            }
            RawTag::Plus => TokenKind::Plus,
            RawTag::Minus => TokenKind::Minus,
            RawTag::Star => TokenKind::Star,
            RawTag::Slash => TokenKind::Slash,
            RawTag::Percent => TokenKind::Percent,
            RawTag::Bang => TokenKind::Bang,
            RawTag::Less => TokenKind::Less,
            RawTag::Greater => TokenKind::Greater,
            RawTag::Equal => TokenKind::Equal,
            RawTag::EqualEqual => TokenKind::EqualEqual,
            RawTag::BangEqual => TokenKind::BangEqual,
            RawTag::LessEqual => TokenKind::LessEqual,
            RawTag::GreaterEqual => TokenKind::GreaterEqual,
            RawTag::AmpAmp => TokenKind::AmpAmp,
            RawTag::PipePipe => TokenKind::PipePipe,
            RawTag::DotQuestion => TokenKind::DotQuestion,
            RawTag::BracketQuestion => TokenKind::BracketQuestion,
            RawTag::Dot => TokenKind::Dot,
            RawTag::Question => TokenKind::Question,
            RawTag::LeftParen => TokenKind::LeftParen,
            RawTag::RightParen => TokenKind::RightParen,
            RawTag::LeftBracket => TokenKind::LeftBracket,
            RawTag::RightBracket => TokenKind::RightBracket,
            RawTag::LeftBrace => TokenKind::LeftBrace,
            RawTag::RightBrace => TokenKind::RightBrace,
            RawTag::Comma => TokenKind::Comma,
            RawTag::Colon => TokenKind::Colon,
            RawTag::Whitespace | RawTag::LineComment => unreachable!("trivia filtered above"),
        };

        tokens.push(Token { kind, span });
    }

    let already_has_eof = matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof);
    if !already_has_eof {
        tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::point(pos),
        });
    }

    (tokens, issues)
}

fn cook_ident(text: &str, interner: &mut StringInterner) -> TokenKind {
    match literal_keyword(text) {
        Some(LiteralKeyword::True) => TokenKind::Constant(Constant::Bool(true)),
        Some(LiteralKeyword::False) => TokenKind::Constant(Constant::Bool(false)),
        Some(LiteralKeyword::Null) => TokenKind::Constant(Constant::Null),
        None => TokenKind::Ident(interner.intern(text)),
    }
}

fn cook_int(text: &str) -> Result<Constant, String> {
    let (digits, unsigned) = strip_unsigned_suffix(text);
    if unsigned {
        digits
            .parse::<u64>()
            .map(Constant::Uint)
            .map_err(|_| format!("invalid unsigned integer literal '{text}'"))
    } else {
        digits
            .parse::<i64>()
            .map(Constant::Int)
            .map_err(|_| format!("invalid integer literal '{text}'"))
    }
}

fn cook_hex_int(text: &str) -> Result<Constant, String> {
    let (rest, unsigned) = strip_unsigned_suffix(text);
    let digits = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
        .unwrap_or(rest);
    if unsigned {
        u64::from_str_radix(digits, 16)
            .map(Constant::Uint)
            .map_err(|_| format!("invalid hex integer literal '{text}'"))
    } else {
        i64::from_str_radix(digits, 16)
            .map(Constant::Int)
            .map_err(|_| format!("invalid hex integer literal '{text}'"))
    }
}

fn strip_unsigned_suffix(text: &str) -> (&str, bool) {
    if let Some(rest) = text.strip_suffix('u').or_else(|| text.strip_suffix('U')) {
        (rest, true)
    } else {
        (text, false)
    }
}

/// Splits a string/bytes literal's lexeme into `(raw, body, body_start)`:
/// `raw` reflects any `r`/`R` prefix character (composable with `b`/`B`
/// in any order), `body` is the text between the (possibly tripled)
/// quotes, and `body_start` is `body`'s byte offset within `text`, used
/// to translate a body-relative error offset back to the token's span.
fn literal_parts(text: &str) -> (bool, &str, u32) {
    let mut i = 0;
    let bytes = text.as_bytes();
    let mut raw = false;
    while matches!(bytes[i], b'r' | b'R' | b'b' | b'B') {
        if matches!(bytes[i], b'r' | b'R') {
            raw = true;
        }
        i += 1;
    }
    let quote = bytes[i];
    let triple = bytes.get(i + 1) == Some(&quote) && bytes.get(i + 2) == Some(&quote);
    let quote_len = if triple { 3 } else { 1 };
    let body = &text[i + quote_len..text.len() - quote_len];
    (raw, body, u32::try_from(i + quote_len).unwrap_or(0))
}

fn cook_string_literal(text: &str, start: u32, issues: &mut IssueCollector) -> Option<Constant> {
    let (raw, body, body_start) = literal_parts(text);
    match cook_string(body, raw) {
        Ok(s) => Some(Constant::String(s)),
        Err(errors) => {
            for e in errors {
                let span = Span::point(start + body_start + e.body_offset);
                issues.push(Diagnostic::error(ErrorCode::E0004, e.message, span));
            }
            None
        }
    }
}

fn cook_bytes_literal(text: &str, start: u32, issues: &mut IssueCollector) -> Option<Constant> {
    let (raw, body, body_start) = literal_parts(text);
    match cook_bytes(body, raw) {
        Ok(b) => Some(Constant::Bytes(b)),
        Err(errors) => {
            for e in errors {
                let span = Span::point(start + body_start + e.body_offset);
                issues.push(Diagnostic::error(ErrorCode::E0004, e.message, span));
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_kinds(source: &str) -> Vec<TokenKind> {
        let mut interner = StringInterner::new();
        let (tokens, issues) = lex(source, &mut interner);
        assert!(issues.all().is_empty(), "unexpected issues: {:?}", issues.all());
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_arithmetic_expression_with_whitespace_dropped() {
        assert_eq!(
            lex_kinds("1 + 2"),
            vec![
                TokenKind::Constant(Constant::Int(1)),
                TokenKind::Plus,
                TokenKind::Constant(Constant::Int(2)),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_keywords_as_constants_not_idents() {
        let mut interner = StringInterner::new();
        let (tokens, _) = lex("true && false", &mut interner);
        assert_eq!(tokens[0].kind, TokenKind::Constant(Constant::Bool(true)));
        assert_eq!(tokens[2].kind, TokenKind::Constant(Constant::Bool(false)));
    }

    #[test]
    fn lexes_ident_and_select() {
        let mut interner = StringInterner::new();
        let (tokens, issues) = lex("request.auth", &mut interner);
        assert!(issues.all().is_empty());
        assert!(matches!(tokens[0].kind, TokenKind::Ident(_)));
        assert_eq!(tokens[1].kind, TokenKind::Dot);
        assert_eq!(interner.resolve(match tokens[0].kind {
            TokenKind::Ident(n) => n,
            _ => unreachable!(),
        }), "request");
    }

    #[test]
    fn lexes_unsigned_and_hex_integers() {
        assert_eq!(
            lex_kinds("42u"),
            vec![TokenKind::Constant(Constant::Uint(42)), TokenKind::Eof]
        );
        assert_eq!(
            lex_kinds("0xFFu"),
            vec![TokenKind::Constant(Constant::Uint(255)), TokenKind::Eof]
        );
        assert_eq!(
            lex_kinds("0x2A"),
            vec![TokenKind::Constant(Constant::Int(42)), TokenKind::Eof]
        );
    }

    #[test]
    fn lexes_string_and_bytes_literals() {
        assert_eq!(
            lex_kinds(r#""a\nb""#),
            vec![
                TokenKind::Constant(Constant::String("a\nb".to_string())),
                TokenKind::Eof
            ]
        );
        assert_eq!(
            lex_kinds(r#"b"ab""#),
            vec![
                TokenKind::Constant(Constant::Bytes(vec![b'a', b'b'])),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn raw_string_keeps_backslashes_literal() {
        assert_eq!(
            lex_kinds(r#"r"a\nb""#),
            vec![
                TokenKind::Constant(Constant::String("a\\nb".to_string())),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unterminated_string_is_reported_as_issue() {
        let mut interner = StringInterner::new();
        let (_, issues) = lex("\"abc", &mut interner);
        assert!(issues.has_errors());
        assert_eq!(issues.errors().next().unwrap().code, ErrorCode::E0001);
    }

    #[test]
    fn invalid_escape_is_reported_as_issue() {
        let mut interner = StringInterner::new();
        let (_, issues) = lex(r#""bad\qescape""#, &mut interner);
        assert!(issues.has_errors());
        assert_eq!(issues.errors().next().unwrap().code, ErrorCode::E0004);
    }

    #[test]
    fn line_comment_is_dropped() {
        assert_eq!(
            lex_kinds("1 // comment\n+ 2"),
            vec![
                TokenKind::Constant(Constant::Int(1)),
                TokenKind::Plus,
                TokenKind::Constant(Constant::Int(2)),
                TokenKind::Eof,
            ]
        );
    }
}
