//! Sentinel-terminated source buffer for bounds-check-free scanning.
//!
//! The buffer guarantees a `0x00` sentinel byte after the source content,
//! so the scanner can detect EOF with a plain equality check instead of
//! bounds-checking every `peek()`.
//!
//! During construction the buffer also scans for encoding issues: a
//! leading UTF-8/UTF-16 BOM (CEL source is plain UTF-8, no BOM) and
//! interior NUL bytes (the `unicode_char` production in the grammar
//! excludes NUL). Both are forbidden; the integration layer (`cel_lexer`)
//! turns them into diagnostics with spans.

use crate::Cursor;

/// Sentinel-terminated source buffer for bounds-check-free scanning.
#[derive(Clone, Debug)]
pub struct SourceBuffer {
    /// `[source_bytes..., 0x00 sentinel]`.
    buf: Vec<u8>,
    /// Length of the actual source content (excludes the sentinel).
    source_len: u32,
    /// Encoding issues detected during construction.
    encoding_issues: Vec<EncodingIssue>,
}

/// An encoding issue detected while building a [`SourceBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodingIssue {
    pub kind: EncodingIssueKind,
    pub pos: u32,
    pub len: u32,
}

/// Kind of encoding issue detected in source content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodingIssueKind {
    Utf8Bom,
    Utf16LeBom,
    Utf16BeBom,
    InteriorNull,
}

impl SourceBuffer {
    /// Builds a sentinel-terminated buffer from CEL source text.
    ///
    /// Source longer than `u32::MAX` bytes is accepted but `source_len`
    /// saturates; the compiler's `maxExpressionCodePointSize` cap is
    /// expected to reject such input well before this matters.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let source_bytes = source.as_bytes();
        let source_len = u32::try_from(source_bytes.len()).unwrap_or(u32::MAX);

        let mut encoding_issues = Vec::new();
        if source_bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            encoding_issues.push(EncodingIssue {
                kind: EncodingIssueKind::Utf8Bom,
                pos: 0,
                len: 3,
            });
        } else if source_bytes.starts_with(&[0xFF, 0xFE]) {
            encoding_issues.push(EncodingIssue {
                kind: EncodingIssueKind::Utf16LeBom,
                pos: 0,
                len: 2,
            });
        } else if source_bytes.starts_with(&[0xFE, 0xFF]) {
            encoding_issues.push(EncodingIssue {
                kind: EncodingIssueKind::Utf16BeBom,
                pos: 0,
                len: 2,
            });
        }

        for (i, &b) in source_bytes.iter().enumerate() {
            if b == 0 {
                encoding_issues.push(EncodingIssue {
                    kind: EncodingIssueKind::InteriorNull,
                    pos: u32::try_from(i).unwrap_or(u32::MAX),
                    len: 1,
                });
            }
        }

        let mut buf = Vec::with_capacity(source_bytes.len() + 1);
        buf.extend_from_slice(source_bytes);
        buf.push(0);

        SourceBuffer {
            buf,
            source_len,
            encoding_issues,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.source_len as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source_len == 0
    }

    #[must_use]
    pub fn encoding_issues(&self) -> &[EncodingIssue] {
        &self.encoding_issues
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.source_len as usize]
    }

    /// Byte at `pos`, or the `0x00` sentinel if `pos >= len()`.
    #[must_use]
    pub fn byte_at(&self, pos: u32) -> u8 {
        self.buf.get(pos as usize).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(self)
    }
}
