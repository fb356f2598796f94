//! Line-start table and offset/coordinate conversion.
//!
//! ## Why a Flat Table?
//!
//! Buffers handled here are editor-sized. Rebuilding the table with one
//! linear pass whenever the text changes is cheaper than keeping an
//! incrementally patched structure correct:
//! - **offset → coordinate**: binary search over line starts, O(log n)
//! - **coordinate → offset**: direct lookup plus a walk over one line
//!
//! ## Learning: Lifetimes in Structs
//!
//! ```rust,ignore
//! let text = String::from("a\nb");
//! let mapper = PositionMapper::new(&text); // mapper BORROWS text
//! // text.push('c');                       // ERROR! text is borrowed
//! ```

use std::ops::Range;

use crate::{Coordinate, TextError, TextResult};

/// Cumulative line-start offsets of one text snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTable {
    /// Byte offset at which each line starts; always begins with 0
    line_starts: Vec<usize>,

    /// Length of the indexed text in bytes
    len: usize,
}

impl LineTable {
    /// Scans `text` once for newlines.
    pub fn build(text: &str) -> Self {
        let mut line_starts = Vec::with_capacity(text.len() / 32 + 1);
        line_starts.push(0);
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            line_starts,
            len: text.len(),
        }
    }

    /// Returns the number of lines (a trailing newline opens an empty line).
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Returns the length in bytes of the indexed text.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the indexed text was empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the 0-based index of the line containing `offset`.
    fn line_index(&self, offset: usize) -> usize {
        self.line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }

    /// Returns the byte range of a 1-based line, newline excluded.
    pub fn line_range(&self, line: usize) -> TextResult<Range<usize>> {
        if line == 0 || line > self.line_starts.len() {
            return Err(TextError::InvalidLine(line));
        }
        let start = self.line_starts[line - 1];
        let end = match self.line_starts.get(line) {
            Some(&next) => next - 1,
            None => self.len,
        };
        Ok(start..end)
    }
}

/// Converts between offsets and coordinates for one borrowed text.
#[derive(Debug, Clone)]
pub struct PositionMapper<'a> {
    text: &'a str,
    table: LineTable,
}

impl<'a> PositionMapper<'a> {
    /// Builds a mapper, scanning `text` for line starts.
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            table: LineTable::build(text),
        }
    }

    /// Reuses a table previously built from the same `text`.
    pub fn with_table(text: &'a str, table: LineTable) -> Self {
        debug_assert_eq!(text.len(), table.len());
        Self { text, table }
    }

    /// Returns the underlying table.
    pub fn table(&self) -> &LineTable {
        &self.table
    }

    /// Returns the number of lines.
    pub fn line_count(&self) -> usize {
        self.table.line_count()
    }

    /// Returns the text of a 1-based line without its newline.
    pub fn line_text(&self, line: usize) -> TextResult<&'a str> {
        let range = self.table.line_range(line)?;
        Ok(&self.text[range])
    }

    /// Iterates `(line_number, line_start_offset, line_text)` for every line.
    pub fn lines(&self) -> impl Iterator<Item = (usize, usize, &'a str)> + '_ {
        (1..=self.table.line_count()).filter_map(move |line| {
            let range = self.table.line_range(line).ok()?;
            Some((line, range.start, &self.text[range]))
        })
    }

    /// Converts a byte offset to a coordinate.
    ///
    /// Offsets past the end clamp to the end of the text; an offset inside
    /// a multi-byte character maps to that character's column.
    pub fn offset_to_coord(&self, offset: usize) -> Coordinate {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }

        let index = self.table.line_index(offset);
        let line_start = self.table.line_starts[index];
        let column = self.text[line_start..offset].chars().count();

        Coordinate::new(index + 1, column)
    }

    /// Converts a coordinate back to a byte offset.
    ///
    /// The column may equal the line length (the position after the last
    /// character of the line).
    pub fn coord_to_offset(&self, coord: Coordinate) -> TextResult<usize> {
        let range = self.table.line_range(coord.line)?;
        let line = &self.text[range.clone()];

        if coord.column == 0 {
            return Ok(range.start);
        }

        match line.char_indices().nth(coord.column) {
            Some((byte, _)) => Ok(range.start + byte),
            None if line.chars().count() == coord.column => Ok(range.end),
            None => Err(TextError::PositionOutOfBounds {
                line: coord.line,
                column: coord.column,
            }),
        }
    }
}
