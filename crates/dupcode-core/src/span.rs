use std::fmt;

use serde::{Deserialize, Serialize};

/// Source region covered by a node or diagnostic.
///
/// Lines are 1-based, columns 0-based. A node's span always encloses
/// the spans of all of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Span {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Span covering a single source line.
    pub fn line(line: u32) -> Self {
        Span::new(line, 0, line, 0)
    }

    /// Smallest span enclosing both `self` and `other`.
    pub fn merge(&self, other: Span) -> Span {
        let (start_line, start_col) =
            if (self.start_line, self.start_col) <= (other.start_line, other.start_col) {
                (self.start_line, self.start_col)
            } else {
                (other.start_line, other.start_col)
            };
        let (end_line, end_col) = if (self.end_line, self.end_col) >= (other.end_line, other.end_col)
        {
            (self.end_line, self.end_col)
        } else {
            (other.end_line, other.end_col)
        };
        Span::new(start_line, start_col, end_line, end_col)
    }

    pub fn contains(&self, other: Span) -> bool {
        (self.start_line, self.start_col) <= (other.start_line, other.start_col)
            && (self.end_line, self.end_col) >= (other.end_line, other.end_col)
    }

    /// Number of source lines covered, including the last.
    pub fn line_count(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_orders_endpoints() {
        let a = Span::new(3, 4, 5, 0);
        let b = Span::new(1, 0, 4, 8);
        let merged = a.merge(b);
        assert_eq!(merged, Span::new(1, 0, 5, 0));
    }

    #[test]
    fn test_contains() {
        let outer = Span::new(1, 0, 10, 0);
        let inner = Span::new(2, 4, 9, 1);
        assert!(outer.contains(inner));
        assert!(!inner.contains(outer));
    }

    #[test]
    fn test_line_count() {
        assert_eq!(Span::new(4, 0, 6, 2).line_count(), 3);
        assert_eq!(Span::line(7).line_count(), 1);
    }
}
