//! Source location tracking for tokens, AST nodes, and errors.

use std::fmt;

/// A region of source text, identified by its starting position.
///
/// Lines and columns are 1-indexed and byte-based; `len` is the byte length
/// of the region so error printers can underline it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// Create a span from line, column, and length.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Create a zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    /// Whether this span covers no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The byte length of this span.
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Extend this span to also cover `other`.
    ///
    /// Spans on different lines keep the first position; the combined length
    /// is an approximation in that case.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        if self.line == other.line {
            let start = self.col.min(other.col);
            let end = (self.col + self.len).max(other.col + other.len);
            Span::new(self.line, start, end - start)
        } else {
            Span::new(self.line, self.col, self.len + other.len)
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_basics() {
        let span = Span::new(2, 7, 3);
        assert_eq!(span.len(), 3);
        assert!(!span.is_empty());
        assert!(Span::point(2, 7).is_empty());
    }

    #[test]
    fn span_display_is_line_colon_col() {
        assert_eq!(Span::new(12, 4, 9).to_string(), "12:4");
    }

    #[test]
    fn merge_same_line_covers_both() {
        let a = Span::new(1, 5, 3);
        let b = Span::new(1, 10, 4);
        let merged = a.merge(b);
        assert_eq!(merged.col, 5);
        assert_eq!(merged.len, 9);
    }

    #[test]
    fn merge_across_lines_keeps_first_position() {
        let a = Span::new(1, 5, 3);
        let b = Span::new(4, 2, 2);
        let merged = a.merge(b);
        assert_eq!(merged.line, 1);
        assert_eq!(merged.col, 5);
    }
}
