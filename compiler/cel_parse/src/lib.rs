//! Lexer-fed recursive-descent parser and macro expander for CEL.
//!
//! Produces a flat AST in an `ExprArena` (see `cel_ir`), together with the
//! source positions and macro-call records a checker or formatter needs
//! (§4.3, §4.3.2, §4.4).

mod cursor;
mod macros;
mod parser;

pub use macros::{MacroExpander, MacroFactory, MacroRegistry};
pub use parser::{parse, ParseOutput, ParserOptions};
