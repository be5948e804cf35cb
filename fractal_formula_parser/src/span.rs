//! Source locations for diagnostics
//!
//! Tokens carry byte offsets; diagnostics carry 1-based line/column pairs.
//! The [`SourceMap`] converts between the two by binary search over the
//! line start table.

use serde::{Deserialize, Serialize};

/// A 1-based line/column position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Maps byte offsets to line/column positions.
#[derive(Debug, Clone)]
pub struct SourceMap {
    /// Byte positions where each line starts
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in source.char_indices() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Get the 1-based line and column for a byte offset.
    pub fn location(&self, offset: usize) -> SourceLocation {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        SourceLocation {
            line: line + 1,
            column: offset - line_start + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let map = SourceMap::new("hello");
        assert_eq!(map.location(0), SourceLocation { line: 1, column: 1 });
        assert_eq!(map.location(4), SourceLocation { line: 1, column: 5 });
    }

    #[test]
    fn test_multi_line() {
        let map = SourceMap::new("hello\nworld\n");
        assert_eq!(map.location(5), SourceLocation { line: 1, column: 6 });
        assert_eq!(map.location(6), SourceLocation { line: 2, column: 1 });
        assert_eq!(map.location(11), SourceLocation { line: 2, column: 6 });
    }

    #[test]
    fn test_offset_past_end() {
        let map = SourceMap::new("ab\ncd");
        assert_eq!(map.location(5), SourceLocation { line: 2, column: 3 });
    }
}
