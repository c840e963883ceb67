// ABOUTME: Source location type shared by the lexer, parser, and error diagnostics

use std::fmt;

/// A location in the original source text, one-based for both line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn new(line: usize, col: usize) -> Self {
        Span { line, col }
    }

    /// Used for synthesized nodes that have no direct source position of their own.
    pub fn start() -> Self {
        Span { line: 1, col: 1 }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_display() {
        let s = Span::new(3, 7);
        assert_eq!(format!("{}", s), "line 3, column 7");
    }
}
