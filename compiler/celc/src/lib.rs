//! Composition root tying `cel_parse` and `cel_types` together behind a
//! single [`Builder::build`] call (§2, §6).
//!
//! This crate owns no grammar or type-checking rules of its own; it only
//! wires the pieces from the other crates into one configurable,
//! cloneable pipeline.

mod builder;
mod options;

pub use builder::{Builder, CompiledAst};
pub use options::{EnvOptions, FunctionFilter};
