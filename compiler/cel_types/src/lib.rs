//! Type algebra, environment, unifier, and checker (spec §3-§4.6) for the
//! CEL compiler core.
//!
//! This crate owns everything "type checking" means for CEL: the type
//! algebra itself ([`ty`]), its interning pool ([`pool`]), unification and
//! least-upper-bound ([`unify`]), the declaration environment
//! ([`env`]), the frozen standard-library declarations ([`registry`]),
//! and the post-order checker that ties them to a parsed AST
//! ([`check`]). It has no lexer, parser, or evaluator of its own; it
//! consumes `cel_ir::ExprArena` and produces a [`check::CheckResult`].

mod check;
mod env;
mod mask;
mod pool;
mod registry;
mod ty;
mod unify;

pub use check::{check, check_expecting, CheckResult, EmptyTypeProvider, ExtensionType, FieldType, Reference, TypeProvider};
pub use env::{candidate_names, Env, FunctionDecl, OverloadDecl, VarDecl};
pub use mask::MaskingTypeProvider;
pub use pool::{Pool, VarState};
pub use registry::{build_standard_env, DeclFilter, StandardOptions};
pub use ty::{TypeData, TypeId, VarId};
pub use unify::{JsonAnchors, UnifyError, Unifier};
