//! Error codes for every compiler diagnostic.
//!
//! The first digit indicates which subsystem raised the issue, matching
//! the error-kind taxonomy: lex/parse, macro, name, type, config.

use std::fmt;

/// A stable identifier for one diagnostic, e.g. `E2001`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Lexer errors (E0xxx)
    /// Unterminated string or bytes literal.
    E0001,
    /// Invalid character in source.
    E0002,
    /// Invalid numeric literal.
    E0003,
    /// Invalid escape sequence.
    E0004,
    /// Code point out of range (surrogate or beyond U+10FFFF).
    E0005,
    /// Expression code-point size exceeds the configured limit.
    E0006,

    // Parser errors (E1xxx)
    /// Unexpected token.
    E1001,
    /// Expected an expression.
    E1002,
    /// Unclosed delimiter.
    E1003,
    /// Expected an identifier.
    E1004,
    /// Optional syntax used while disabled.
    E1005,
    /// Reserved identifier used as a name.
    E1006,
    /// Parse recursion depth exceeded.
    E1007,
    /// Error-recovery limit exceeded.
    E1008,

    // Macro errors (E2xxx)
    /// Macro argument is not a simple identifier.
    E2001,
    /// Invalid argument to `has()`.
    E2002,
    /// Custom macro reported an error.
    E2003,

    // Name-resolution errors (E3xxx)
    /// Undeclared reference.
    E3001,
    /// Ambiguous reference: multiple overloads share a signature.
    E3002,

    // Type errors (E4xxx)
    /// No matching overload for a call.
    E4001,
    /// Field not present on struct.
    E4002,
    /// Field type mismatch in struct initialization.
    E4003,
    /// Comprehension loop condition is not `bool`.
    E4004,
    /// Comprehension loop step is incompatible with the accumulator type.
    E4005,
    /// Field access on a non-message/non-map/non-optional type.
    E4006,
    /// `null` used where a primitive is expected.
    E4007,
    /// Expected type does not match the actual type.
    E4008,

    // Configuration errors (E5xxx)
    /// More than one of include/exclude/filter was set.
    E5001,
    /// Attempted to override a standard declaration.
    E5002,
    /// Invalid field mask.
    E5003,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::E0001 => "E0001",
            ErrorCode::E0002 => "E0002",
            ErrorCode::E0003 => "E0003",
            ErrorCode::E0004 => "E0004",
            ErrorCode::E0005 => "E0005",
            ErrorCode::E0006 => "E0006",
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            ErrorCode::E1004 => "E1004",
            ErrorCode::E1005 => "E1005",
            ErrorCode::E1006 => "E1006",
            ErrorCode::E1007 => "E1007",
            ErrorCode::E1008 => "E1008",
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E3001 => "E3001",
            ErrorCode::E3002 => "E3002",
            ErrorCode::E4001 => "E4001",
            ErrorCode::E4002 => "E4002",
            ErrorCode::E4003 => "E4003",
            ErrorCode::E4004 => "E4004",
            ErrorCode::E4005 => "E4005",
            ErrorCode::E4006 => "E4006",
            ErrorCode::E4007 => "E4007",
            ErrorCode::E4008 => "E4008",
            ErrorCode::E5001 => "E5001",
            ErrorCode::E5002 => "E5002",
            ErrorCode::E5003 => "E5003",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_with_leading_e() {
        assert_eq!(ErrorCode::E4001.as_str(), "E4001");
        assert_eq!(format!("{}", ErrorCode::E1002), "E1002");
    }
}
