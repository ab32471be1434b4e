//! Cooked token stream: spans, interned identifiers, and decoded literal
//! values, ready for the parser to consume.

use cel_ir::{Constant, Name, Span};

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Ident(Name),
    Constant(Constant),

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Less,
    Greater,
    Equal,
    EqualEqual,
    BangEqual,
    LessEqual,
    GreaterEqual,
    AmpAmp,
    PipePipe,
    DotQuestion,
    BracketQuestion,
    Dot,
    Question,

    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Colon,

    Eof,
}

impl TokenKind {
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Ident(_) => "identifier",
            TokenKind::Constant(_) => "literal",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::Bang => "`!`",
            TokenKind::Less => "`<`",
            TokenKind::Greater => "`>`",
            TokenKind::Equal => "`=`",
            TokenKind::EqualEqual => "`==`",
            TokenKind::BangEqual => "`!=`",
            TokenKind::LessEqual => "`<=`",
            TokenKind::GreaterEqual => "`>=`",
            TokenKind::AmpAmp => "`&&`",
            TokenKind::PipePipe => "`||`",
            TokenKind::DotQuestion => "`.?`",
            TokenKind::BracketQuestion => "`[?`",
            TokenKind::Dot => "`.`",
            TokenKind::Question => "`?`",
            TokenKind::LeftParen => "`(`",
            TokenKind::RightParen => "`)`",
            TokenKind::LeftBracket => "`[`",
            TokenKind::RightBracket => "`]`",
            TokenKind::LeftBrace => "`{`",
            TokenKind::RightBrace => "`}`",
            TokenKind::Comma => "`,`",
            TokenKind::Colon => "`:`",
            TokenKind::Eof => "end of input",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cel_ir::Span;

    #[test]
    fn describe_covers_operators_and_literals() {
        let tok = Token {
            kind: TokenKind::Constant(Constant::Bool(true)),
            span: Span::new(0, 4),
        };
        assert_eq!(tok.kind.describe(), "literal");
        assert_eq!(TokenKind::EqualEqual.describe(), "`==`");
    }
}
