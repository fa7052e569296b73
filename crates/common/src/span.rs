use serde::{Deserialize, Serialize};
use std::fmt;

/// A location in a source file.
///
/// `line` and `column` are 1-indexed; `column` counts bytes, matching the
/// tree-sitter point model the front end is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Byte offset from the start of the file.
    pub offset: u32,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(offset: u32, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Computes line and column for `offset` by scanning `source`.
    ///
    /// Offsets past the end of `source` are clamped to its length.
    ///
    /// # Example
    /// ```
    /// # use common::Position;
    /// let pos = Position::locate("ab\ncd", 4);
    /// assert_eq!((pos.line, pos.column), (2, 2));
    /// ```
    pub fn locate(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let prefix = &source.as_bytes()[..offset];
        let line = prefix.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = prefix
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        Self {
            offset: offset as u32,
            line: line as u32,
            column: (offset - line_start + 1) as u32,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open byte range `[start, end)` of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: Position,
    pub end: Position,
}

impl SourceSpan {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Builds a span from raw byte offsets, resolving line/column against `source`.
    pub fn from_offsets(source: &str, start: usize, end: usize) -> Self {
        Self {
            start: Position::locate(source, start),
            end: Position::locate(source, end),
        }
    }

    pub fn start_byte(&self) -> usize {
        self.start.offset as usize
    }

    pub fn end_byte(&self) -> usize {
        self.end.offset as usize
    }

    /// `true` when the two spans share at least one byte.
    pub fn overlaps(&self, other: &SourceSpan) -> bool {
        self.start.offset < other.end.offset && other.start.offset < self.end.offset
    }

    /// `true` when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &SourceSpan) -> bool {
        self.start.offset <= other.start.offset && other.end.offset <= self.end.offset
    }

    /// Returns the covered text, or `None` if the span does not fit `source`.
    pub fn text<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.start_byte()..self.end_byte())
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
