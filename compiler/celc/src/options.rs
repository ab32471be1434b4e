//! `EnvOptions` (§6): every configuration flag the parser and checker
//! consume, collected in one place since a caller configures a single
//! compilation, not two independent passes.

use cel_parse::ParserOptions;
use cel_types::{DeclFilter, StandardOptions};

/// Configuration for one [`crate::Builder`]. Splits into the sub-structs
/// each downstream crate actually consumes (`cel_parse::ParserOptions`,
/// `cel_types::StandardOptions`) rather than flattening every field here,
/// so a caller can reuse either half independently of `celc`.
#[derive(Clone, Debug, Default)]
pub struct EnvOptions {
    /// Container for relative name resolution (§3.6). Empty means every
    /// reference is resolved as-is with no qualification prefix tried.
    pub container: String,
    pub parser: ParserOptions,
    pub standard: StandardOptions,
}

impl EnvOptions {
    pub fn with_container(container: impl Into<String>) -> Self {
        EnvOptions { container: container.into(), ..Self::default() }
    }
}

/// Convenience re-export so callers configuring `functions`/`identifiers`
/// filters don't need a direct `cel_types` dependency for this alone.
pub type FunctionFilter = DeclFilter;
