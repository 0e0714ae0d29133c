use serde::{Deserialize, Serialize};

/// Inclusive range of 1-based source lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn single(line: u32) -> Self {
        Self::new(line, line)
    }

    /// Check if a line number is within this range
    pub fn contains_line(&self, line: u32) -> bool {
        line >= self.start && line <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_line_is_inclusive() {
        let range = LineRange::new(10, 20);
        assert!(range.contains_line(10));
        assert!(range.contains_line(15));
        assert!(range.contains_line(20));
        assert!(!range.contains_line(9));
        assert!(!range.contains_line(25));
    }
}
