//! Source position tracking for the SCAD lexer, parser, and evaluator.
//!
//! Every token and syntax-tree node carries a [`Position`] so diagnostics can
//! point back at the offending source text. Positions are 1-based line and
//! column numbers, matching how a human reading the source counts them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-based (line, column) location in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (counted in bytes of the UTF-8 source).
    pub column: u32,
}

impl Position {
    /// The position of the very first byte of a source file.
    pub const START: Position = Position { line: 1, column: 1 };

    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Advances this position past one ASCII byte or UTF-8 continuation byte
    /// that is not a newline.
    #[inline]
    pub fn advance_column(&mut self) {
        self.column += 1;
    }

    /// Advances this position past a newline.
    #[inline]
    pub fn advance_line(&mut self) {
        self.line += 1;
        self.column = 1;
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open range `[start, end)` of source positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    #[inline]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A zero-width span at a single position, used for synthesized nodes.
    #[inline]
    pub const fn point(pos: Position) -> Self {
        Self { start: pos, end: pos }
    }

    /// Returns a span that covers both `self` and `other`.
    pub fn union(&self, other: Span) -> Span {
        let start = if self.start <= other.start { self.start } else { other.start };
        let end = if self.end >= other.end { self.end } else { other.end };
        Span { start, end }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_column_and_line() {
        let mut pos = Position::START;
        pos.advance_column();
        assert_eq!(pos, Position::new(1, 2));
        pos.advance_line();
        assert_eq!(pos, Position::new(2, 1));
    }

    #[test]
    fn span_union_picks_outer_bounds() {
        let a = Span::new(Position::new(1, 1), Position::new(1, 5));
        let b = Span::new(Position::new(2, 1), Position::new(2, 3));
        let u = a.union(b);
        assert_eq!(u.start, Position::new(1, 1));
        assert_eq!(u.end, Position::new(2, 3));
    }

    #[test]
    fn display_formats_line_and_column() {
        assert_eq!(Position::new(3, 7).to_string(), "3:7");
    }
}
