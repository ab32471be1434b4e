//! Terminal-style rendering of diagnostics: `ERROR: <desc>:<line>:<col>: <msg>`
//! followed by a one-line snippet and a caret underline.
//!
//! Wide code points (CJK ideographs, Hangul, full-width forms, emoji) are
//! treated as occupying two display cells; the caret and its leading pad
//! use full-width glyphs under those code points so the caret still lines
//! up visually in a monospace terminal. Tabs are copied into the pad
//! verbatim so the terminal's own tab stops keep the alignment correct.

use cel_ir::Source;

use crate::Diagnostic;

/// Returns `true` if `ch` is conventionally rendered as two terminal cells
/// wide (CJK ideographs and syllabaries, Hangul, full-width forms, and the
/// common emoji blocks, plus surrogate-pair-requiring code points beyond
/// the BMP).
fn is_wide(ch: char) -> bool {
    let cp = ch as u32;
    matches!(cp,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x1F300..=0x1FAFF
        | 0x20000..=0x3FFFD
    )
}

/// Build the two-line `| <snippet>` / `| <pad>^` block for one line and
/// 1-based display column.
fn snippet_and_caret(source: &Source, line: u32, display_col: u32) -> (String, String) {
    let snippet = source.line_snippet(line);
    let before = (display_col.saturating_sub(1)) as usize;

    let mut pad = String::new();
    let mut chars = snippet.chars();
    for ch in chars.by_ref().take(before) {
        if ch == '\t' {
            pad.push('\t');
        } else if is_wide(ch) {
            pad.push_str("．");
        } else {
            pad.push('.');
        }
    }
    let caret_is_wide = chars.next().is_some_and(is_wide);
    pad.push(if caret_is_wide { '＾' } else { '^' });

    (snippet.to_string(), pad)
}

/// Render one diagnostic in the textual format:
/// `ERROR: <desc>:<line>:<col>: <msg>\n | <line-snippet>\n | <pad>^`
pub fn format_diagnostic(source: &Source, diagnostic: &Diagnostic) -> String {
    let (line, col) = source.offset_to_line_col(diagnostic.span.start);
    let (snippet, pad) = snippet_and_caret(source, line, col);
    format!(
        "{severity}: {desc}:{line}:{col}: {msg}\n | {snippet}\n | {pad}",
        severity = diagnostic.severity,
        desc = source.description(),
        msg = diagnostic.message,
    )
}

/// Render every diagnostic, separated by blank lines.
pub fn format_all(source: &Source, diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format_diagnostic(source, d))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use cel_ir::Span;

    #[test]
    fn narrow_caret_aligns_one_past_dot() {
        let source = Source::new("a.b\n&&arg(missing, paren", "<input>");
        // Byte offset 1 is the '.' character.
        let diag = Diagnostic::error(ErrorCode::E1002, "expected expression", Span::point(1));
        let rendered = format_diagnostic(&source, &diag);
        assert!(rendered.contains(":1:2: expected expression"));
        assert!(rendered.contains(" | a.b"));
        assert!(rendered.contains(" | .^"));
    }

    #[test]
    fn wide_char_uses_full_width_caret() {
        let source = Source::new("你好吗\n我b很好\n", "<input>");
        // Line 2 = "我b很好". Byte offset of the 4th char ('好', 3rd after 我 b 很).
        let line2_start = source.line_start(2).unwrap();
        let offset = line2_start + "我b很".len() as u32;
        let diag = Diagnostic::error(ErrorCode::E4001, "bad", Span::point(offset));
        let rendered = format_diagnostic(&source, &diag);
        assert!(rendered.contains(":2:4:"));
        assert!(rendered.contains("＾"));
    }

    #[test]
    fn is_wide_detects_cjk_and_narrow_ascii() {
        assert!(is_wide('好'));
        assert!(!is_wide('a'));
        assert!(!is_wide('.'));
    }
}
