//! A single diagnostic: severity, code, message, and the span it applies
//! to.

use cel_ir::{ExprId, Span};
use std::fmt;

use crate::ErrorCode;

/// Severity of a diagnostic. Only `Error` prevents a successful build;
/// `Warning`s may accompany a successful checked AST.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

/// One diagnostic produced by the lexer, parser, or checker.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
    pub span: Span,
    /// The expression this diagnostic is attached to, when it was raised
    /// during checking (the checker accumulates issues per expression id).
    pub expr_id: Option<ExprId>,
}

impl Diagnostic {
    pub fn error(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
            expr_id: None,
        }
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            code,
            message: message.into(),
            span,
            expr_id: None,
        }
    }

    #[must_use]
    pub fn with_expr(mut self, id: ExprId) -> Self {
        self.expr_id = Some(id);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_constructor_sets_severity() {
        let d = Diagnostic::error(ErrorCode::E4001, "no matching overload", Span::new(0, 1));
        assert!(d.is_error());
        assert_eq!(d.code, ErrorCode::E4001);
    }

    #[test]
    fn warning_constructor_is_not_error() {
        let d = Diagnostic::warning(ErrorCode::E2002, "deferred", Span::DUMMY);
        assert!(!d.is_error());
    }
}
