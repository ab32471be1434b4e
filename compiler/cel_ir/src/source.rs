//! Source text plus the position bookkeeping the parser accumulates while
//! walking it.

use crate::{ExprId, Name};
use rustc_hash::FxHashMap;

/// The original call skeleton recorded for a macro expansion, keyed by the
/// id of the expansion's root (the comprehension that replaced it).
///
/// Arguments that were themselves macro calls are recorded as their own
/// expanded root id; reconstructing the original surface syntax means
/// looking those up recursively in the same map.
#[derive(Debug, Clone)]
pub struct MacroCall {
    pub target: Option<ExprId>,
    pub function: Name,
    pub args: Vec<ExprId>,
    pub receiver_style: bool,
}

/// Map from an expansion's root id to the macro call it replaced. Populated
/// only when `populate_macro_calls` is enabled.
pub type MacroCalls = FxHashMap<ExprId, MacroCall>;

/// Map from expression id to the byte-offset position it was parsed at.
pub type Positions = FxHashMap<ExprId, crate::Span>;

/// An immutable source: text plus a description (e.g. a filename) used in
/// diagnostics, plus line-start offsets for O(log n) line/column lookup.
///
/// Once built, a `Source` is never mutated: the parser accumulates
/// positions and macro calls into owned maps that are handed back together
/// with it (see `cel_parse`'s `ParseOutput`), rather than mutating a shared
/// `Source` in place.
#[derive(Debug, Clone)]
pub struct Source {
    content: String,
    description: String,
    /// Byte offset of each line start. `line_offsets[0] == 0`.
    line_offsets: Vec<u32>,
}

impl Source {
    pub fn new(content: impl Into<String>, description: impl Into<String>) -> Self {
        let content = content.into();
        let line_offsets = Self::compute_line_offsets(&content);
        Source {
            content,
            description: description.into(),
            line_offsets,
        }
    }

    fn compute_line_offsets(content: &str) -> Vec<u32> {
        let mut offsets = vec![0u32];
        for (i, byte) in content.as_bytes().iter().enumerate() {
            if *byte == b'\n' {
                offsets.push((i + 1) as u32);
            }
        }
        offsets
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Number of Unicode scalar values (code points) in the content.
    pub fn code_point_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Number of lines recorded (at least 1, even for empty content).
    pub fn line_count(&self) -> usize {
        self.line_offsets.len()
    }

    /// Byte offset of the start of 1-based `line`. Returns `None` if out of
    /// range.
    pub fn line_start(&self, line: u32) -> Option<u32> {
        if line == 0 {
            return None;
        }
        self.line_offsets.get((line - 1) as usize).copied()
    }

    /// 1-based line number containing `offset` (a byte offset).
    pub fn line_from_offset(&self, offset: u32) -> u32 {
        match self.line_offsets.binary_search(&offset) {
            Ok(exact) => (exact as u32) + 1,
            Err(insert) => insert.saturating_sub(1) as u32 + 1,
        }
    }

    /// 1-based (line, column) for a byte offset. Column counts Unicode
    /// scalar values from the line start, 1-based.
    pub fn offset_to_line_col(&self, offset: u32) -> (u32, u32) {
        let line = self.line_from_offset(offset);
        let line_start = self.line_start(line).unwrap_or(0) as usize;
        let offset = (offset as usize).min(self.content.len());
        let col = self.content[line_start..offset].chars().count() as u32 + 1;
        (line, col)
    }

    /// The text of 1-based `line`, excluding its trailing newline. Returns
    /// an empty string for the synthetic line one past the end of content.
    pub fn line_snippet(&self, line: u32) -> &str {
        let Some(start) = self.line_start(line) else {
            return "";
        };
        let start = start as usize;
        let end = self
            .line_start(line + 1)
            .map(|e| (e as usize).saturating_sub(1))
            .unwrap_or(self.content.len());
        let end = end.max(start).min(self.content.len());
        &self.content[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_source() {
        let s = Source::new("hello", "<input>");
        assert_eq!(s.line_count(), 1);
        assert_eq!(s.offset_to_line_col(0), (1, 1));
        assert_eq!(s.offset_to_line_col(5), (1, 6));
    }

    #[test]
    fn multi_line_source() {
        let s = Source::new("a.b\n&&arg(missing, paren", "<input>");
        assert_eq!(s.line_count(), 2);
        assert_eq!(s.line_snippet(1), "a.b");
        assert_eq!(s.offset_to_line_col(1), (1, 2));
    }

    #[test]
    fn synthetic_line_past_end_is_empty() {
        let s = Source::new("abc", "<input>");
        assert_eq!(s.line_snippet(2), "");
    }

    #[test]
    fn unicode_columns_count_code_points() {
        let s = Source::new("你好吗\n我b很好\n", "<input>");
        // '好' is the second code point on line 2... actually line 1.
        let (line, col) = s.offset_to_line_col(3); // byte 3 = second char '好' (each CJK char is 3 bytes)
        assert_eq!(line, 1);
        assert_eq!(col, 2);
    }
}
