//! A cheap cursor over an already-lexed [`Token`] slice.
//!
//! CEL's token set carries no tag/flag side-tables the way a larger
//! language's lexer might (§4.3's grammar has no contextual keywords, no
//! significant whitespace, no doc comments to track), so this cursor is
//! just a position into a borrowed slice. Kind comparisons use
//! `std::mem::discriminant` rather than full equality since most callers
//! only care which variant they're looking at (the payload of an
//! `Ident`/`Constant` token is never what `check`/`expect` need).

use std::mem::discriminant;

use cel_ir::Span;
use cel_lexer::{Token, TokenKind};

pub struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// `tokens` must end with an `Eof` token (what `cel_lexer::lex` always
    /// produces), so `advance` never needs to guard against running past
    /// the slice.
    pub fn new(tokens: &'a [Token]) -> Self {
        debug_assert!(
            matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)),
            "token stream must end with Eof"
        );
        Cursor { tokens, pos: 0 }
    }

    #[inline]
    pub fn current(&self) -> &'a Token {
        &self.tokens[self.pos]
    }

    #[inline]
    pub fn current_kind(&self) -> &'a TokenKind {
        &self.current().kind
    }

    #[inline]
    pub fn current_span(&self) -> Span {
        self.current().span
    }

    /// Span of the token just consumed by the most recent `advance`.
    /// Panics if called before any token has been consumed.
    #[inline]
    pub fn previous_span(&self) -> Span {
        self.tokens[self.pos - 1].span
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    /// Matches `kind`'s variant, ignoring payload (an `Ident`/`Constant`
    /// token always matches regardless of which name or literal it holds).
    #[inline]
    pub fn check(&self, kind: &TokenKind) -> bool {
        discriminant(self.current_kind()) == discriminant(kind)
    }

    /// Advance past the current token, unless already at `Eof` (the
    /// stream's last token, which is never consumed).
    #[inline]
    pub fn advance(&mut self) {
        if !self.is_eof() {
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cel_ir::StringInterner;

    #[test]
    fn advance_stops_at_eof() {
        let mut interner = StringInterner::new();
        let (tokens, issues) = cel_lexer::lex("1", &mut interner);
        assert!(issues.is_empty());
        let mut cursor = Cursor::new(&tokens);
        assert!(cursor.check(&TokenKind::Constant(cel_ir::Constant::Int(0))));
        cursor.advance();
        assert!(cursor.is_eof());
        cursor.advance();
        assert!(cursor.is_eof());
    }
}
