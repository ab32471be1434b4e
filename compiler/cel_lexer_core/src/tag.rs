//! Raw token tag produced by the low-level scanner.
//!
//! `RawTag` carries no position or text payload beyond a byte length; it
//! maps to `cel_lexer::TokenKind` during cooking, where literal bodies are
//! decoded and identifiers are classified against the keyword table.
//!
//! # Discriminant layout
//!
//! | Range   | Category     |
//! |---------|--------------|
//! | 0-9     | Identifiers & literals |
//! | 32-63   | Operators    |
//! | 80-95   | Delimiters   |
//! | 112-114 | Trivia       |
//! | 240-245 | Errors       |
//! | 255     | EOF          |
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
#[repr(u8)]
pub enum RawTag {
    /// Identifier or reserved word (classified during cooking).
    Ident = 0,
    /// Decimal integer literal, optionally `u`/`U`-suffixed.
    Int = 1,
    /// `0x`/`0X` hexadecimal integer literal, optionally `u`/`U`-suffixed.
    HexInt = 2,
    /// Floating-point literal.
    Float = 3,
    /// String literal: single/double/triple-quoted, optional `r`/`R` prefix.
    String = 4,
    /// Bytes literal: `b`/`B` prefix, optionally combined with `r`/`R`.
    Bytes = 5,

    // === Operators (32-63) ===
    Plus = 32,
    Minus = 33,
    Star = 34,
    Slash = 35,
    Percent = 36,
    Bang = 37,
    Less = 38,
    Greater = 39,
    Equal = 40,
    /// `==`
    EqualEqual = 48,
    /// `!=`
    BangEqual = 49,
    /// `<=`
    LessEqual = 50,
    /// `>=`
    GreaterEqual = 51,
    /// `&&`
    AmpAmp = 52,
    /// `||`
    PipePipe = 53,
    /// `.?`
    DotQuestion = 54,
    /// `[?`
    BracketQuestion = 55,
    Dot = 56,
    Question = 57,

    // === Delimiters (80-95) ===
    LeftParen = 80,
    RightParen = 81,
    LeftBracket = 82,
    RightBracket = 83,
    LeftBrace = 84,
    RightBrace = 85,
    Comma = 86,
    Colon = 87,

    // === Trivia (112-114) ===
    Whitespace = 112,
    LineComment = 114,

    // === Errors (240-245) ===
    InvalidByte = 240,
    UnterminatedString = 241,
    UnterminatedBytes = 242,
    InteriorNull = 245,

    // === Control ===
    Eof = 255,
}

impl RawTag {
    /// Fixed lexeme for tags whose text never varies; `None` for
    /// identifiers, literals, and error tags.
    #[must_use]
    pub fn lexeme(self) -> Option<&'static str> {
        match self {
            Self::Plus => Some("+"),
            Self::Minus => Some("-"),
            Self::Star => Some("*"),
            Self::Slash => Some("/"),
            Self::Percent => Some("%"),
            Self::Bang => Some("!"),
            Self::Less => Some("<"),
            Self::Greater => Some(">"),
            Self::Equal => Some("="),
            Self::EqualEqual => Some("=="),
            Self::BangEqual => Some("!="),
            Self::LessEqual => Some("<="),
            Self::GreaterEqual => Some(">="),
            Self::AmpAmp => Some("&&"),
            Self::PipePipe => Some("||"),
            Self::DotQuestion => Some(".?"),
            Self::BracketQuestion => Some("[?"),
            Self::Dot => Some("."),
            Self::Question => Some("?"),
            Self::LeftParen => Some("("),
            Self::RightParen => Some(")"),
            Self::LeftBracket => Some("["),
            Self::RightBracket => Some("]"),
            Self::LeftBrace => Some("{"),
            Self::RightBrace => Some("}"),
            Self::Comma => Some(","),
            Self::Colon => Some(":"),
            _ => None,
        }
    }

    /// Human-readable name, used in diagnostic messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Ident => "identifier",
            Self::Int => "integer literal",
            Self::HexInt => "hex integer literal",
            Self::Float => "float literal",
            Self::String => "string literal",
            Self::Bytes => "bytes literal",
            Self::Whitespace => "whitespace",
            Self::LineComment => "line comment",
            Self::InvalidByte => "invalid byte",
            Self::UnterminatedString => "unterminated string literal",
            Self::UnterminatedBytes => "unterminated bytes literal",
            Self::InteriorNull => "interior null byte",
            Self::Eof => "end of input",
            other => other.lexeme().unwrap_or("unknown token"),
        }
    }

    #[must_use]
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::LineComment)
    }
}

/// Raw token produced by the low-level scanner: a tag and a byte length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawToken {
    pub tag: RawTag,
    pub len: u32,
}

const _: () = assert!(std::mem::size_of::<RawTag>() == 1);
const _: () = assert!(std::mem::size_of::<RawToken>() == 8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminant_ranges() {
        assert_eq!(RawTag::Ident as u8, 0);
        assert_eq!(RawTag::Bytes as u8, 5);
        assert_eq!(RawTag::Plus as u8, 32);
        assert_eq!(RawTag::LeftParen as u8, 80);
        assert_eq!(RawTag::Whitespace as u8, 112);
        assert_eq!(RawTag::InvalidByte as u8, 240);
        assert_eq!(RawTag::Eof as u8, 255);
    }

    #[test]
    fn fixed_lexemes() {
        assert_eq!(RawTag::EqualEqual.lexeme(), Some("=="));
        assert_eq!(RawTag::DotQuestion.lexeme(), Some(".?"));
        assert_eq!(RawTag::BracketQuestion.lexeme(), Some("[?"));
        assert_eq!(RawTag::Ident.lexeme(), None);
    }

    #[test]
    fn trivia_classification() {
        assert!(RawTag::Whitespace.is_trivia());
        assert!(RawTag::LineComment.is_trivia());
        assert!(!RawTag::Ident.is_trivia());
    }

    #[test]
    fn raw_token_is_eight_bytes() {
        let tok = RawToken {
            tag: RawTag::Int,
            len: 3,
        };
        assert_eq!(tok.len, 3);
    }
}
