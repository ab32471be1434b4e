//! Core data types shared by every stage of the CEL compiler: source text
//! and positions, interned names, the expression arena, and literal
//! constant values.
//!
//! # Design philosophy
//!
//! - **Intern identifiers**: strings become `Name(u32)` for O(1) equality.
//! - **Flatten the tree**: nodes hold `ExprId` children, not `Box<Expr>`,
//!   so every id in an AST is trivially unique (it's an arena index).
//! - **Immutable after construction**: `ExprArena`/`Source` are built once
//!   by the parser and never mutated afterwards; the checker attaches a
//!   parallel type/reference map keyed by `ExprId` rather than touching
//!   the tree.

mod ast;
mod constant;
mod expr_id;
mod interner;
mod name;
mod source;
mod span;

pub use ast::{Expr, ExprArena, ExprKind, FieldInit, MapEntry};
pub use constant::Constant;
pub use expr_id::{ExprId, ExprIdGenerator};
pub use interner::StringInterner;
pub use name::Name;
pub use source::{MacroCall, MacroCalls, Positions, Source};
pub use span::Span;
