//! Line/column coordinates.
//!
//! ## Learning: Newtype Pattern
//!
//! `Coordinate` wraps a line/column pair instead of passing `(usize, usize)`
//! around, so line and column can never be swapped by accident.

use serde::{Deserialize, Serialize};

/// A location in a buffer.
///
/// Lines are 1-based, columns are 0-based and counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (0-based, in characters not bytes)
    pub column: usize,
}

impl Coordinate {
    /// Creates a new coordinate.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Start of the buffer.
    pub const START: Coordinate = Coordinate { line: 1, column: 0 };
}

impl Default for Coordinate {
    fn default() -> Self {
        Self::START
    }
}

impl PartialOrd for Coordinate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coordinate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.line.cmp(&other.line) {
            std::cmp::Ordering::Equal => self.column.cmp(&other.column),
            other => other,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.line, self.column)
    }
}
