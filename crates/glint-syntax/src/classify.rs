//! Token classifier: keyword, builtin and bracket spans over masked text.
//!
//! Rules run in the grammar's order (keyword, builtin, square bracket,
//! parenthesis, curly brace) and every rule emits all of its
//! non-overlapping matches. Spans from different rules may overlap; the
//! one emitted later wins when rendered.

use crate::grammar::Grammar;
use crate::span::{Tag, TaggedSpan};

/// Default column after which a line counts as overlong.
pub const DEFAULT_OVERLONG_LIMIT: usize = 78;

/// Classifies a masked range whose first byte sits at host offset
/// `range_start`.
pub fn classify(masked: &[u8], grammar: &Grammar, range_start: usize) -> Vec<TaggedSpan> {
    let mut spans = Vec::new();
    for rule in grammar.token_rules() {
        spans.extend(
            rule.pattern
                .find_iter(masked)
                .filter(|m| !m.is_empty())
                .map(|m| TaggedSpan::new(range_start + m.start(), range_start + m.end(), rule.tag)),
        );
    }
    spans
}

/// Tags the part of every line beyond `limit` characters as `too_long`.
pub fn mark_overlong_lines(text: &str, limit: usize) -> Vec<TaggedSpan> {
    let mut spans = Vec::new();
    let mut line_start = 0;

    for line in text.split('\n') {
        if let Some((cut, _)) = line.char_indices().nth(limit) {
            spans.push(TaggedSpan::new(
                line_start + cut,
                line_start + line.len(),
                Tag::TooLong,
            ));
        }
        line_start += line.len() + 1;
    }

    spans
}
