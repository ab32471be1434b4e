//! Diagnostic reporting for the CEL compiler: error codes, the
//! `Diagnostic` record, an append-only collector, and a terminal-style
//! renderer with caret underlines.

mod diagnostic;
mod emitter;
mod error_code;
mod queue;

pub use diagnostic::{Diagnostic, Severity};
pub use emitter::{format_all, format_diagnostic};
pub use error_code::ErrorCode;
pub use queue::IssueCollector;
