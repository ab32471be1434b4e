//! Keyword and reserved-identifier tables.
//!
//! `true`, `false`, and `null` are literals in every CEL dialect and are
//! always recognized regardless of configuration. The broader reserved
//! set is only rejected when `enableReservedIds` is on; otherwise those
//! words lex as ordinary identifiers (CEL keeps them reserved for
//! forward compatibility with languages CEL embeds into, not because the
//! grammar itself needs them).

/// Literal keywords: always reserved, never valid identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiteralKeyword {
    True,
    False,
    Null,
}

#[must_use]
pub fn literal_keyword(ident: &str) -> Option<LiteralKeyword> {
    match ident {
        "true" => Some(LiteralKeyword::True),
        "false" => Some(LiteralKeyword::False),
        "null" => Some(LiteralKeyword::Null),
        _ => None,
    }
}

/// The reserved-identifier set from the grammar's `RESERVED` production,
/// rejected only when `enableReservedIds` is set on the environment.
const RESERVED: &[&str] = &[
    "as", "break", "const", "continue", "else", "false", "for", "function", "if", "import", "in",
    "let", "loop", "namespace", "null", "package", "return", "true", "var", "void", "while",
];

#[must_use]
pub fn is_reserved(ident: &str) -> bool {
    RESERVED.contains(&ident)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_literal_keywords() {
        assert_eq!(literal_keyword("true"), Some(LiteralKeyword::True));
        assert_eq!(literal_keyword("false"), Some(LiteralKeyword::False));
        assert_eq!(literal_keyword("null"), Some(LiteralKeyword::Null));
        assert_eq!(literal_keyword("nullable"), None);
    }

    #[test]
    fn reserved_set_matches_grammar() {
        assert!(is_reserved("package"));
        assert!(is_reserved("let"));
        assert!(!is_reserved("size"));
        assert!(!is_reserved("request"));
    }
}
