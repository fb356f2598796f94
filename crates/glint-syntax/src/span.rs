//! Tagged spans produced by a highlight pass.

use glint_text::Coordinate;
use serde::{Deserialize, Serialize};

/// Display tag carried by a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    Keyword,
    Builtin,
    String,
    Comment,
    Parenthesis,
    CurlyBrace,
    SquareBracket,
    TooLong,
    MatchingBrace,
    LoneBrace,
}

impl Tag {
    /// Returns the tag name an editor surface styles by.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Keyword => "keyword",
            Tag::Builtin => "builtin",
            Tag::String => "string",
            Tag::Comment => "comment",
            Tag::Parenthesis => "parenthesis",
            Tag::CurlyBrace => "curly_brace",
            Tag::SquareBracket => "square_bracket",
            Tag::TooLong => "too_long",
            Tag::MatchingBrace => "matching_brace",
            Tag::LoneBrace => "lone_brace",
        }
    }

    /// Returns the tag used for a bracket character, if it belongs to one
    /// of the three classified families.
    pub fn for_bracket(c: char) -> Option<Tag> {
        match c {
            '(' | ')' => Some(Tag::Parenthesis),
            '[' | ']' => Some(Tag::SquareBracket),
            '{' | '}' => Some(Tag::CurlyBrace),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A classified byte range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaggedSpan {
    /// Start byte offset
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// Display tag
    pub tag: Tag,
}

impl TaggedSpan {
    /// Creates a new span.
    pub fn new(start: usize, end: usize, tag: Tag) -> Self {
        Self { start, end, tag }
    }

    /// Returns the span moved `by` bytes to the right.
    pub fn shifted(self, by: usize) -> Self {
        Self {
            start: self.start + by,
            end: self.end + by,
            tag: self.tag,
        }
    }

    /// Returns the length in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true for a zero-length span.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A span together with its line/column endpoints.
///
/// Spans are listed in application order: when two spans overlap, the one
/// listed later decides the rendered tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightedSpan {
    pub span: TaggedSpan,
    pub from: Coordinate,
    pub to: Coordinate,
}
