//! Brace matcher.
//!
//! Probes the bytes around a cursor for a bracket and scans toward its
//! counterpart, counting nesting depth. Brackets inside string and
//! comment zones are invisible to both the probe and the scan.

use serde::Serialize;

use crate::grammar::Grammar;
use crate::span::{Tag, TaggedSpan};
use crate::zone::{zone_at, Zone};

/// Outcome of a brace match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MatchResult {
    /// Both ends of a balanced pair
    Matched { open: usize, close: usize },
    /// A bracket whose counterpart is missing
    Lone { offset: usize },
    /// No bracket next to the cursor
    None,
}

impl MatchResult {
    /// Overlay spans for the result.
    pub fn spans(&self) -> Vec<TaggedSpan> {
        match *self {
            MatchResult::Matched { open, close } => vec![
                TaggedSpan::new(open, open + 1, Tag::MatchingBrace),
                TaggedSpan::new(close, close + 1, Tag::MatchingBrace),
            ],
            MatchResult::Lone { offset } => vec![TaggedSpan::new(offset, offset + 1, Tag::LoneBrace)],
            MatchResult::None => Vec::new(),
        }
    }

    /// Moves every offset by `by`.
    pub fn shifted(self, by: usize) -> Self {
        match self {
            MatchResult::Matched { open, close } => MatchResult::Matched {
                open: open + by,
                close: close + by,
            },
            MatchResult::Lone { offset } => MatchResult::Lone { offset: offset + by },
            MatchResult::None => MatchResult::None,
        }
    }
}

/// Matches the bracket at `cursor - 1`, `cursor` or `cursor + 1`, first
/// hit wins. `zones` must come from a scan of the whole `text`.
pub fn match_brace(text: &str, zones: &[Zone], cursor: usize, grammar: &Grammar) -> MatchResult {
    let bytes = text.as_bytes();
    let probes = [cursor.checked_sub(1), Some(cursor), cursor.checked_add(1)];

    for probe in probes.into_iter().flatten() {
        let Some(&byte) = bytes.get(probe) else {
            continue;
        };
        if !byte.is_ascii() || zone_at(zones, probe).is_some() {
            continue;
        }
        let Some((partner, opens)) = grammar.bracket_partner(byte as char) else {
            continue;
        };
        // Non-ASCII counterparts never occur as a single byte
        let Ok(partner) = u8::try_from(partner) else {
            return MatchResult::Lone { offset: probe };
        };

        return if opens {
            scan_forward(bytes, zones, probe, byte, partner)
        } else {
            scan_backward(bytes, zones, probe, byte, partner)
        };
    }

    MatchResult::None
}

fn scan_forward(bytes: &[u8], zones: &[Zone], anchor: usize, open: u8, close: u8) -> MatchResult {
    let mut depth = 1usize;
    let mut q = anchor + 1;

    while q < bytes.len() {
        if let Some(zone) = zone_at(zones, q) {
            q = zone.end;
            continue;
        }
        if bytes[q] == close {
            depth -= 1;
            if depth == 0 {
                return MatchResult::Matched { open: anchor, close: q };
            }
        } else if bytes[q] == open {
            depth += 1;
        }
        q += 1;
    }

    MatchResult::Lone { offset: anchor }
}

fn scan_backward(bytes: &[u8], zones: &[Zone], anchor: usize, close: u8, open: u8) -> MatchResult {
    let mut depth = 1usize;
    let mut q = anchor;

    while q > 0 {
        q -= 1;
        if let Some(zone) = zone_at(zones, q) {
            q = zone.start;
            continue;
        }
        if bytes[q] == open {
            depth -= 1;
            if depth == 0 {
                return MatchResult::Matched { open: q, close: anchor };
            }
        } else if bytes[q] == close {
            depth += 1;
        }
    }

    MatchResult::Lone { offset: anchor }
}
