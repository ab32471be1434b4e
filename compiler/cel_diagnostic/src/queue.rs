//! Accumulates diagnostics raised during parsing or checking.
//!
//! Both the parser's error-recovery loop and the checker's per-expression
//! error accumulation push into one of these; nothing here decides whether
//! a build ultimately succeeds, that's the caller's job (`has_errors()`).

use cel_ir::ExprId;

use crate::Diagnostic;

/// An ordered, append-only collection of diagnostics.
#[derive(Debug, Default)]
pub struct IssueCollector {
    diagnostics: Vec<Diagnostic>,
}

impl IssueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// All diagnostics attached to one expression id, in push order.
    pub fn for_expr(&self, id: ExprId) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.expr_id == Some(id))
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Merge another collector's diagnostics into this one, preserving
    /// order (self's diagnostics first).
    pub fn extend(&mut self, other: IssueCollector) {
        self.diagnostics.extend(other.diagnostics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use cel_ir::Span;

    #[test]
    fn has_errors_false_for_warnings_only() {
        let mut q = IssueCollector::new();
        q.push(Diagnostic::warning(ErrorCode::E2002, "deferred", Span::DUMMY));
        assert!(!q.has_errors());
        assert_eq!(q.warnings().count(), 1);
    }

    #[test]
    fn has_errors_true_with_one_error() {
        let mut q = IssueCollector::new();
        q.push(Diagnostic::warning(ErrorCode::E2002, "deferred", Span::DUMMY));
        q.push(Diagnostic::error(ErrorCode::E4001, "no overload", Span::DUMMY));
        assert!(q.has_errors());
        assert_eq!(q.errors().count(), 1);
    }

    #[test]
    fn for_expr_filters_by_id() {
        let mut q = IssueCollector::new();
        let id = ExprId::new(1);
        q.push(Diagnostic::error(ErrorCode::E4001, "a", Span::DUMMY).with_expr(id));
        q.push(Diagnostic::error(ErrorCode::E4001, "b", Span::DUMMY).with_expr(ExprId::new(2)));
        assert_eq!(q.for_expr(id).count(), 1);
    }

    #[test]
    fn extend_preserves_order() {
        let mut a = IssueCollector::new();
        a.push(Diagnostic::error(ErrorCode::E4001, "first", Span::DUMMY));
        let mut b = IssueCollector::new();
        b.push(Diagnostic::error(ErrorCode::E4001, "second", Span::DUMMY));
        a.extend(b);
        let msgs: Vec<_> = a.all().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(msgs, vec!["first", "second"]);
    }
}
