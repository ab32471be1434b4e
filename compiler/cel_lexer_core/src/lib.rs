//! Low-level tokenizer for CEL expression text.
//!
//! This crate is the "raw" half of the lexer's two-layer architecture:
//!
//! - **`cel_lexer_core`** (this crate): produces `(RawTag, len)` pairs from
//!   raw bytes. No spans, no interning, no diagnostics, no `cel_*`
//!   dependencies at all.
//! - **`cel_lexer`**: "cooks" raw tokens into compiler-ready form with
//!   spans, interned identifiers, keyword resolution, and decoded literal
//!   constants.

mod cursor;
mod raw_scanner;
mod source_buffer;
mod tag;

pub use cursor::Cursor;
pub use raw_scanner::{tokenize, RawScanner};
pub use source_buffer::{EncodingIssue, EncodingIssueKind, SourceBuffer};
pub use tag::{RawTag, RawToken};
