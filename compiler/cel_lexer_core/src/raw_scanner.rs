//! Scans a [`SourceBuffer`] into a stream of [`RawToken`]s.
//!
//! The scanner only determines token *extent*; it does not validate
//! escape sequences or decode literal bodies; that happens in the
//! cooking layer, which has access to the source text and can report
//! positioned diagnostics.

use crate::{Cursor, RawTag, RawToken, SourceBuffer};

/// Scans a whole buffer and collects every [`RawToken`], including a
/// final [`RawTag::Eof`] with length zero.
#[must_use]
pub fn tokenize(buf: &SourceBuffer) -> Vec<RawToken> {
    let mut scanner = RawScanner::new(buf);
    let mut tokens = Vec::new();
    loop {
        let tok = scanner.next_token();
        let is_eof = tok.tag == RawTag::Eof;
        tokens.push(tok);
        if is_eof {
            break;
        }
    }
    tokens
}

/// Stateless-between-calls scanner: each `next_token` call advances the
/// cursor and returns exactly one [`RawToken`].
pub struct RawScanner<'a> {
    cursor: Cursor<'a>,
}

impl<'a> RawScanner<'a> {
    #[must_use]
    pub fn new(buf: &'a SourceBuffer) -> Self {
        RawScanner {
            cursor: buf.cursor(),
        }
    }

    #[must_use]
    pub fn pos(&self) -> u32 {
        self.cursor.pos()
    }

    /// Scans and consumes the next token.
    pub fn next_token(&mut self) -> RawToken {
        let start = self.cursor.pos();
        if self.cursor.is_eof() {
            return RawToken {
                tag: RawTag::Eof,
                len: 0,
            };
        }

        let tag = match self.cursor.first() {
            b' ' | b'\t' | b'\r' | b'\n' => {
                self.cursor.eat_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'));
                RawTag::Whitespace
            }
            b'/' if self.cursor.second() == b'/' => {
                self.cursor.eat_while(|b| b != b'\n');
                RawTag::LineComment
            }
            b'0'..=b'9' => self.scan_number(),
            b'"' | b'\'' => self.scan_string(),
            b'r' | b'R' | b'b' | b'B' => self.scan_ident_or_prefixed_literal(),
            c if is_ident_start(c) => self.scan_ident(),
            b'+' => {
                self.cursor.bump();
                RawTag::Plus
            }
            b'-' => {
                self.cursor.bump();
                RawTag::Minus
            }
            b'*' => {
                self.cursor.bump();
                RawTag::Star
            }
            b'/' => {
                self.cursor.bump();
                RawTag::Slash
            }
            b'%' => {
                self.cursor.bump();
                RawTag::Percent
            }
            b'(' => {
                self.cursor.bump();
                RawTag::LeftParen
            }
            b')' => {
                self.cursor.bump();
                RawTag::RightParen
            }
            b'[' => {
                self.cursor.bump();
                if self.cursor.first() == b'?' {
                    self.cursor.bump();
                    RawTag::BracketQuestion
                } else {
                    RawTag::LeftBracket
                }
            }
            b']' => {
                self.cursor.bump();
                RawTag::RightBracket
            }
            b'{' => {
                self.cursor.bump();
                RawTag::LeftBrace
            }
            b'}' => {
                self.cursor.bump();
                RawTag::RightBrace
            }
            b',' => {
                self.cursor.bump();
                RawTag::Comma
            }
            b':' => {
                self.cursor.bump();
                RawTag::Colon
            }
            b'.' => {
                self.cursor.bump();
                if self.cursor.first() == b'?' {
                    self.cursor.bump();
                    RawTag::DotQuestion
                } else {
                    RawTag::Dot
                }
            }
            b'?' => {
                self.cursor.bump();
                RawTag::Question
            }
            b'!' => {
                self.cursor.bump();
                if self.cursor.first() == b'=' {
                    self.cursor.bump();
                    RawTag::BangEqual
                } else {
                    RawTag::Bang
                }
            }
            b'=' => {
                self.cursor.bump();
                if self.cursor.first() == b'=' {
                    self.cursor.bump();
                    RawTag::EqualEqual
                } else {
                    RawTag::Equal
                }
            }
            b'<' => {
                self.cursor.bump();
                if self.cursor.first() == b'=' {
                    self.cursor.bump();
                    RawTag::LessEqual
                } else {
                    RawTag::Less
                }
            }
            b'>' => {
                self.cursor.bump();
                if self.cursor.first() == b'=' {
                    self.cursor.bump();
                    RawTag::GreaterEqual
                } else {
                    RawTag::Greater
                }
            }
            b'&' if self.cursor.second() == b'&' => {
                self.cursor.bump();
                self.cursor.bump();
                RawTag::AmpAmp
            }
            b'|' if self.cursor.second() == b'|' => {
                self.cursor.bump();
                self.cursor.bump();
                RawTag::PipePipe
            }
            0 => {
                self.cursor.bump();
                RawTag::InteriorNull
            }
            _ => {
                self.cursor.bump();
                RawTag::InvalidByte
            }
        };

        let len = self.cursor.pos() - start;
        RawToken { tag, len }
    }

    /// `r`/`R`/`b`/`B` start either a plain identifier or a string/bytes
    /// literal prefix; composable in any case/order (`rb`, `Rb`, `bR`, ...).
    fn scan_ident_or_prefixed_literal(&mut self) -> RawTag {
        let save = self.cursor.clone();
        let mut saw_r = false;
        let mut saw_b = false;
        loop {
            match self.cursor.first() {
                b'r' | b'R' if !saw_r => {
                    saw_r = true;
                    self.cursor.bump();
                }
                b'b' | b'B' if !saw_b => {
                    saw_b = true;
                    self.cursor.bump();
                }
                b'"' | b'\'' => {
                    let tag = self.scan_string();
                    return if saw_b {
                        match tag {
                            RawTag::String => RawTag::Bytes,
                            RawTag::UnterminatedString => RawTag::UnterminatedBytes,
                            other => other,
                        }
                    } else {
                        tag
                    };
                }
                _ => break,
            }
        }
        // Not actually a prefix; rewind and lex as a plain identifier.
        self.cursor = save;
        self.scan_ident()
    }

    fn scan_ident(&mut self) -> RawTag {
        self.cursor.bump();
        self.cursor.eat_while(is_ident_continue);
        RawTag::Ident
    }

    /// Scans a (single, double, or triple-quoted) quoted body, including
    /// the delimiting quotes. Backslash escapes are skipped over without
    /// validation so an escaped quote cannot end the literal early.
    fn scan_string(&mut self) -> RawTag {
        let quote = self.cursor.first();
        self.cursor.bump();

        let triple = self.cursor.first() == quote && self.cursor.second() == quote;
        if triple {
            self.cursor.bump();
            self.cursor.bump();
        }

        loop {
            if self.cursor.is_eof() {
                return RawTag::UnterminatedString;
            }
            let c = self.cursor.first();
            if c == b'\\' {
                self.cursor.bump();
                if !self.cursor.is_eof() {
                    self.cursor.bump();
                }
                continue;
            }
            if c == quote {
                if !triple {
                    self.cursor.bump();
                    return RawTag::String;
                }
                if self.cursor.second() == quote && self.cursor.third() == quote {
                    self.cursor.bump();
                    self.cursor.bump();
                    self.cursor.bump();
                    return RawTag::String;
                }
                self.cursor.bump();
                continue;
            }
            if !triple && c == b'\n' {
                return RawTag::UnterminatedString;
            }
            self.cursor.bump();
        }
    }

    /// Scans an integer, hex integer, or float literal (with optional
    /// `u`/`U` unsigned suffix on integers).
    fn scan_number(&mut self) -> RawTag {
        if self.cursor.first() == b'0' && matches!(self.cursor.second(), b'x' | b'X') {
            self.cursor.bump();
            self.cursor.bump();
            self.cursor.eat_while(|b| b.is_ascii_hexdigit());
            if matches!(self.cursor.first(), b'u' | b'U') {
                self.cursor.bump();
            }
            return RawTag::HexInt;
        }

        self.cursor.eat_while(|b| b.is_ascii_digit());

        let mut is_float = false;
        if self.cursor.first() == b'.' && self.cursor.second().is_ascii_digit() {
            is_float = true;
            self.cursor.bump();
            self.cursor.eat_while(|b| b.is_ascii_digit());
        }
        if matches!(self.cursor.first(), b'e' | b'E') {
            let save = self.cursor.clone();
            self.cursor.bump();
            if matches!(self.cursor.first(), b'+' | b'-') {
                self.cursor.bump();
            }
            if self.cursor.first().is_ascii_digit() {
                is_float = true;
                self.cursor.eat_while(|b| b.is_ascii_digit());
            } else {
                self.cursor = save;
            }
        }

        if is_float {
            return RawTag::Float;
        }

        if matches!(self.cursor.first(), b'u' | b'U') {
            self.cursor.bump();
        }
        RawTag::Int
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
