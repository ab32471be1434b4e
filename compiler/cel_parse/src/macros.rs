//! Custom macro extensibility (§6 "Macro expander", §4.4 "Custom
//! macros").
//!
//! The six built-in macros (`has`, `all`, `exists`, `exists_one`, `map`,
//! `filter`) are hand-coded in `parser.rs`: each has a distinct arity and
//! a distinct required diagnostic on misuse, so a generic dispatch table
//! would just be a thin wrapper around a six-armed match anyway. This
//! module is the extension point for everything past the built-ins,
//! registered by `(name, arity, receiver-style?)` exactly as §4.4
//! describes.

use cel_diagnostic::Diagnostic;
use cel_ir::{ExprId, ExprKind, Name, Span};
use rustc_hash::FxHashMap;

/// What a macro expander needs from the parser to build an expansion: id
/// allocation, node insertion, the call's source span, and string
/// interning for any synthetic names it introduces.
pub trait MacroFactory {
    fn push(&mut self, kind: ExprKind, span: Span) -> ExprId;
    fn call_span(&self) -> Span;
    fn intern(&mut self, s: &str) -> Name;
}

/// A pure function from `(factory, target, args)` to an optional
/// expansion (§6). Returning `Ok(None)` declines the match (the call
/// falls through and is assembled as an ordinary `Call` node); `Err`
/// reports a macro-specific diagnostic (E2003) instead.
pub trait MacroExpander: Send + Sync {
    fn expand(
        &self,
        factory: &mut dyn MacroFactory,
        target: Option<ExprId>,
        args: &[ExprId],
    ) -> Result<Option<ExprId>, Diagnostic>;
}

#[derive(Clone, Copy, Eq, PartialEq, Hash)]
struct MacroKey {
    name: &'static str,
    arity: Option<usize>,
    receiver_style: bool,
}

/// Custom-macro lookup table, keyed by `(name, arity, receiver-style?)`.
/// A variadic registration (`arity: None`) matches any argument count for
/// that name/style once no fixed-arity registration matches.
#[derive(Default)]
pub struct MacroRegistry {
    fixed: FxHashMap<MacroKey, Box<dyn MacroExpander>>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: &'static str,
        arity: Option<usize>,
        receiver_style: bool,
        expander: Box<dyn MacroExpander>,
    ) {
        self.fixed.insert(MacroKey { name, arity, receiver_style }, expander);
    }

    pub fn lookup(&self, name: &str, arity: usize, receiver_style: bool) -> Option<&dyn MacroExpander> {
        self.fixed
            .iter()
            .find(|(key, _)| key.name == name && key.arity == Some(arity) && key.receiver_style == receiver_style)
            .or_else(|| {
                self.fixed
                    .iter()
                    .find(|(key, _)| key.name == name && key.arity.is_none() && key.receiver_style == receiver_style)
            })
            .map(|(_, expander)| expander.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cel_ir::{Constant, ExprIdGenerator};

    struct ConstTrue;
    impl MacroExpander for ConstTrue {
        fn expand(
            &self,
            factory: &mut dyn MacroFactory,
            _target: Option<ExprId>,
            _args: &[ExprId],
        ) -> Result<Option<ExprId>, Diagnostic> {
            Ok(Some(factory.push(ExprKind::Constant(Constant::Bool(true)), factory.call_span())))
        }
    }

    struct Factory<'a> {
        arena: &'a mut cel_ir::ExprArena,
        ids: &'a mut ExprIdGenerator,
        interner: &'a mut cel_ir::StringInterner,
        span: Span,
    }

    impl MacroFactory for Factory<'_> {
        fn push(&mut self, kind: ExprKind, span: Span) -> ExprId {
            let id = self.ids.next_id();
            self.arena.insert(id, kind, span);
            id
        }
        fn call_span(&self) -> Span {
            self.span
        }
        fn intern(&mut self, s: &str) -> Name {
            self.interner.intern(s)
        }
    }

    #[test]
    fn fixed_arity_registration_is_found_before_variadic() {
        let mut registry = MacroRegistry::new();
        registry.register("always", Some(0), false, Box::new(ConstTrue));
        assert!(registry.lookup("always", 0, false).is_some());
        assert!(registry.lookup("always", 1, false).is_none());
    }

    #[test]
    fn variadic_registration_matches_any_arity() {
        let mut registry = MacroRegistry::new();
        registry.register("always", None, false, Box::new(ConstTrue));
        assert!(registry.lookup("always", 0, false).is_some());
        assert!(registry.lookup("always", 5, false).is_some());
    }

    #[test]
    fn expander_can_push_a_node_through_the_factory() {
        let mut arena = cel_ir::ExprArena::new();
        let mut ids = ExprIdGenerator::new();
        let mut interner = cel_ir::StringInterner::new();
        let mut factory = Factory { arena: &mut arena, ids: &mut ids, interner: &mut interner, span: Span::DUMMY };
        let id = match ConstTrue.expand(&mut factory, None, &[]) {
            Ok(Some(id)) => id,
            _ => panic!("expected a successful expansion"),
        };
        assert!(matches!(arena.kind(id), ExprKind::Constant(Constant::Bool(true))));
    }
}
