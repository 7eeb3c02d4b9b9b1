//! Source locations
//!
//! Spans are half-open ranges of char offsets into the submitted source.

use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` range of char offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Placeholder span for synthesized nodes
    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    /// Smallest span covering both `self` and `other`
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Line/column (1-based) of a char offset, plus the text of that line
pub fn locate(source: &str, offset: usize) -> (usize, usize, String) {
    let mut line = 1;
    let mut line_start = 0;
    for (i, c) in source.chars().enumerate() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            line_start = i + 1;
        }
    }
    let snippet: String = source
        .chars()
        .skip(line_start)
        .take_while(|c| *c != '\n')
        .collect();
    (line, offset - line_start + 1, snippet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let a = Span::new(3, 5);
        let b = Span::new(8, 12);
        assert_eq!(a.merge(b), Span::new(3, 12));
        assert_eq!(b.merge(a), Span::new(3, 12));
    }

    #[test]
    fn test_locate_second_line() {
        let (line, col, snippet) = locate("let a = 1;\nlet b = ;", 19);
        assert_eq!(line, 2);
        assert_eq!(col, 9);
        assert_eq!(snippet, "let b = ;");
    }
}
