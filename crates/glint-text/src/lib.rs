//! # Glint Text
//!
//! Maps linear byte offsets of a buffer to `(line, column)` coordinates and
//! back.
//!
//! ## Key Concepts for Learning Rust
//!
//! ### Borrowing a Snapshot
//! - `LineTable` owns only the line-start offsets, so it can be cached
//! - `PositionMapper<'a>` borrows the text it was built from; the borrow
//!   checker guarantees the table is never used against edited text
//!
//! ### Offsets vs Columns
//! - Offsets are byte offsets into a `&str` (what the scanners produce)
//! - Columns are counted in characters, the unit an editor surface shows

mod coordinate;
mod line_table;

pub use coordinate::Coordinate;
pub use line_table::{LineTable, PositionMapper};

/// Result type for text mapping operations
pub type TextResult<T> = Result<T, TextError>;

/// Errors that can occur while mapping positions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    #[error("Position {line}:{column} is out of bounds")]
    PositionOutOfBounds { line: usize, column: usize },

    #[error("Line {0} does not exist (lines are 1-based)")]
    InvalidLine(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapper_from_str() {
        let mapper = PositionMapper::new("Hello\nWorld");
        assert_eq!(mapper.line_count(), 2);
        assert_eq!(mapper.offset_to_coord(6), Coordinate::new(2, 0));
    }

    #[test]
    fn test_error_display() {
        let err = TextError::PositionOutOfBounds { line: 3, column: 9 };
        assert_eq!(err.to_string(), "Position 3:9 is out of bounds");
    }
}
