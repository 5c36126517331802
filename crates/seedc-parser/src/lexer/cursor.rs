//! Low-level character cursor over source text.

/// Tracks position while scanning source text.
///
/// The cursor hands out characters one at a time and keeps the
/// line/column bookkeeping that spans are built from. Lines and
/// columns are 1-based; the offset is a byte index into the source.
pub(crate) struct Cursor<'src> {
    source: &'src str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'src> Cursor<'src> {
    pub(crate) fn new(source: &'src str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Byte offset of the next unread character.
    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn line(&self) -> u32 {
        self.line
    }

    pub(crate) fn column(&self) -> u32 {
        self.column
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.offset >= self.source.len()
    }

    /// Peek at the next character without consuming it.
    pub(crate) fn peek(&self) -> Option<char> {
        self.source[self.offset..].chars().next()
    }

    /// Peek `n` characters ahead (`0` is the next character).
    pub(crate) fn peek_nth(&self, n: usize) -> Option<char> {
        self.source[self.offset..].chars().nth(n)
    }

    /// Check whether the next character equals `expected` without consuming.
    pub(crate) fn check(&self, expected: char) -> bool {
        self.peek() == Some(expected)
    }

    /// Consume and return the next character, updating line/column.
    pub(crate) fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consume the next character if it equals `expected`.
    pub(crate) fn eat(&mut self, expected: char) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume characters while `pred` holds.
    pub(crate) fn eat_while(&mut self, mut pred: impl FnMut(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.advance();
        }
    }

    /// Slice of the source from `start` up to the current offset.
    pub(crate) fn slice_from(&self, start: usize) -> &'src str {
        &self.source[start..self.offset]
    }
}
