//! The composition root: wires the parser and checker together behind a
//! single `build()` call (§2, §6, §7).

use std::sync::Arc;

use cel_diagnostic::{Diagnostic, IssueCollector};
use cel_ir::{ExprArena, MacroCalls, Positions, Source, StringInterner};
use cel_parse::MacroRegistry;
use cel_types::{build_standard_env, check_expecting, CheckResult, EmptyTypeProvider, Env, Pool, TypeId, TypeProvider};
use tracing::instrument;

use crate::options::EnvOptions;

/// Everything a successful compilation hands back: the arena, the
/// interner needed to resolve its `Name`s, the position/macro-call
/// bookkeeping the parser accumulated, and the checker's type/reference
/// maps. Bundled together because none of the pieces is useful alone —
/// a `Reference` without the interner is just numbers.
pub struct CompiledAst {
    pub arena: ExprArena,
    pub interner: StringInterner,
    pub positions: Positions,
    pub macro_calls: MacroCalls,
    pub checked: CheckResult,
    /// The type pool `checked.types`' `TypeId`s were interned against;
    /// a `TypeId` is only meaningful alongside the pool that produced it,
    /// so it travels with the rest of the artifact rather than being
    /// discarded at the end of `build()`.
    pub pool: Pool,
}

/// Builds one `EnvOptions`-configured compilation pipeline. Cloning a
/// `Builder` (via [`Builder::to_builder`] or plain `.clone()`) produces
/// an independent snapshot: mutating the clone's options or provider
/// never affects the original, and vice versa (§5, §8).
///
/// Generic over the [`TypeProvider`] implementation rather than
/// `Box<dyn TypeProvider>` so the whole builder stays `Clone` without
/// needing a clone-through-a-trait-object workaround. Defaults to
/// [`EmptyTypeProvider`], the no-op provider, for callers with no
/// message/enum descriptors to register.
#[derive(Clone)]
pub struct Builder<P: TypeProvider + Clone + 'static = EmptyTypeProvider> {
    options: EnvOptions,
    provider: P,
    macros: Arc<MacroRegistry>,
}

impl Builder<EmptyTypeProvider> {
    pub fn new() -> Self {
        Builder {
            options: EnvOptions::default(),
            provider: EmptyTypeProvider,
            macros: Arc::new(MacroRegistry::new()),
        }
    }
}

impl Default for Builder<EmptyTypeProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: TypeProvider + Clone + 'static> Builder<P> {
    pub fn with_options(mut self, options: EnvOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.options.container = container.into();
        self
    }

    /// Replace the custom-macro registry consulted during parsing. Held
    /// behind an `Arc` so cloning a builder never deep-copies the
    /// registered expanders.
    pub fn with_macros(mut self, macros: MacroRegistry) -> Self {
        self.macros = Arc::new(macros);
        self
    }

    /// Swap in a different struct/enum descriptor source, changing the
    /// builder's provider type in the process.
    pub fn with_provider<Q: TypeProvider + Clone + 'static>(self, provider: Q) -> Builder<Q> {
        Builder {
            options: self.options,
            provider,
            macros: self.macros,
        }
    }

    /// Snapshot this builder. Equivalent to `.clone()`; spelled out
    /// separately because it's the name callers reach for (§8).
    #[must_use]
    pub fn to_builder(&self) -> Self {
        self.clone()
    }

    /// Parse and check `source`, returning the typed AST plus any
    /// warnings on success, or the full diagnostic list on failure
    /// (§7's single result sum).
    #[instrument(skip_all, fields(source = source.description()))]
    pub fn build(&self, source: &Source) -> Result<(CompiledAst, Vec<Diagnostic>), Vec<Diagnostic>> {
        self.build_with(source, |_, _, _| None)
    }

    /// Like [`Builder::build`], but runs `declare` against the freshly
    /// built standard environment (and its `Pool`) before parsing. The
    /// hook gets exactly the capability `build()` itself has, so a caller
    /// can declare variables or extra functions whose types are only
    /// constructible against this call's own `Pool` (e.g. `pool.list_of`,
    /// `pool.struct_ref`) without `Builder` needing to carry pre-built
    /// `TypeId`s across pools that don't exist yet. `declare`'s return
    /// value, if any, is checked against the root expression's type
    /// (`E4008` on mismatch, §4.5/§8 scenario 4).
    pub fn build_with(
        &self,
        source: &Source,
        declare: impl FnOnce(&mut Pool, &mut Env, &mut IssueCollector) -> Option<TypeId>,
    ) -> Result<(CompiledAst, Vec<Diagnostic>), Vec<Diagnostic>> {
        let mut issues = IssueCollector::new();
        let mut interner = StringInterner::new();
        let mut pool = Pool::new();

        let mut env = build_standard_env(&mut pool, &self.options.standard, &mut issues);
        if !self.options.container.is_empty() {
            env.set_container(self.options.container.clone());
        }
        let expected = declare(&mut pool, &mut env, &mut issues);

        let output = cel_parse::parse(source, &mut interner, &self.macros, &self.options.parser, &mut issues);
        let checked = check_expecting(&output.arena, &interner, &mut env, &mut pool, &self.provider, expected, &mut issues);

        if issues.has_errors() {
            return Err(issues.into_vec());
        }

        let warnings = issues.into_vec();
        Ok((
            CompiledAst {
                arena: output.arena,
                interner,
                positions: output.positions,
                macro_calls: output.macro_calls,
                checked,
                pool,
            },
            warnings,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(src: &str) -> Result<(CompiledAst, Vec<Diagnostic>), Vec<Diagnostic>> {
        let builder = Builder::new();
        let source = Source::new(src.to_string(), "<test>".to_string());
        builder.build(&source)
    }

    #[test]
    fn simple_arithmetic_checks_to_int() {
        let (compiled, warnings) = match compile("1 + 2") {
            Ok(ok) => ok,
            Err(diags) => panic!("expected success, got {diags:?}"),
        };
        assert!(warnings.is_empty());
        let root = match compiled.arena.root() {
            Some(id) => id,
            None => panic!("builder did not set a root"),
        };
        assert_eq!(compiled.checked.types[&root], cel_types::TypeId::INT);
    }

    #[test]
    fn undeclared_identifier_is_an_error() {
        let result = compile("missing_var");
        assert!(result.is_err());
    }

    #[test]
    fn mutating_a_clone_does_not_affect_the_original() {
        let base = Builder::new();
        let mut narrowed = base.to_builder();
        let mut options = EnvOptions::default();
        options.standard.functions.include = Some(vec!["size".to_string()]);
        narrowed = narrowed.with_options(options);

        let source = Source::new("1 + 2".to_string(), "<test>".to_string());
        assert!(base.build(&source).is_ok(), "original builder must still see `_+_`");
        assert!(narrowed.build(&source).is_err(), "narrowed clone must not see `_+_`");
    }
}
