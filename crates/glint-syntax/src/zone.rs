//! Zone scanner: partitions text into string, comment and code zones.
//!
//! ## Algorithm
//!
//! A single left-to-right sweep. At each position every start delimiter
//! is tried, longest first; the first one that matches opens a zone whose
//! terminator is searched forward, skipping occurrences preceded by an odd
//! number of backslashes. The sweep resumes after the terminator, so zones
//! never overlap and come out sorted.
//!
//! An unterminated zone runs to the end of the scanned range. That is the
//! normal state of a buffer while someone is still typing the closing
//! quote, not an error.
//!
//! ## Masking
//!
//! The scan also produces a masked copy of the range where zone bytes are
//! blanked (newlines kept). Patterns run over the mask can then never see
//! a keyword or bracket that sits inside a string or comment.

use std::ops::Range;

use crate::grammar::{Grammar, ZoneKind};
use crate::span::TaggedSpan;

const MASK: u8 = b' ';

/// A string or comment zone in host-text byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Zone {
    pub start: usize,
    pub end: usize,
    pub kind: ZoneKind,
}

impl Zone {
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn to_span(self) -> TaggedSpan {
        TaggedSpan::new(self.start, self.end, self.kind.tag())
    }
}

/// Result of scanning one range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneScan {
    /// Zones, non-overlapping and sorted by start
    pub zones: Vec<Zone>,

    /// The scanned range with zone bytes blanked out
    pub masked: Vec<u8>,

    /// Host offset of `masked[0]`
    pub range_start: usize,
}

impl ZoneScan {
    /// Returns the zone holding `offset`, if any.
    pub fn zone_at(&self, offset: usize) -> Option<&Zone> {
        zone_at(&self.zones, offset)
    }

    /// Returns one span per zone, tagged with the zone kind.
    pub fn spans(&self) -> impl Iterator<Item = TaggedSpan> + '_ {
        self.zones.iter().map(|z| z.to_span())
    }
}

/// Returns the zone of a sorted zone list holding `offset`.
pub fn zone_at(zones: &[Zone], offset: usize) -> Option<&Zone> {
    let index = zones.partition_point(|z| z.end <= offset);
    zones.get(index).filter(|z| z.contains(offset))
}

/// Scans `text[range]` with the zone rules of `grammar`.
pub fn scan(text: &str, grammar: &Grammar, range: Range<usize>) -> ZoneScan {
    let bytes = text.as_bytes();
    let end = range.end.min(bytes.len());
    let start = range.start.min(end);

    let mut zones = Vec::new();
    let mut p = start;

    'sweep: while p < end {
        for rule in grammar.zones() {
            let open = rule.start.as_bytes();
            if !bytes[p..end].starts_with(open) {
                continue;
            }
            let body = p + open.len();
            let zone_end = match find_terminator(bytes, body, end, rule.end.as_bytes()) {
                Some(close) => close + rule.end.len(),
                None => end,
            };
            zones.push(Zone {
                start: p,
                end: zone_end,
                kind: rule.kind,
            });
            p = zone_end;
            continue 'sweep;
        }
        p += 1;
    }

    let masked = mask(bytes, start..end, &zones);
    ZoneScan {
        zones,
        masked,
        range_start: start,
    }
}

/// Scans the whole of `text` except `holes`, which must be sorted and
/// disjoint. Zones never cross into a hole and hole bytes are blanked in
/// the mask.
pub fn scan_around(text: &str, grammar: &Grammar, holes: &[Range<usize>]) -> ZoneScan {
    let mut zones = Vec::new();
    let mut masked = text.as_bytes().to_vec();
    let mut gap_start = 0;

    let tail = text.len()..text.len();
    for hole in holes.iter().chain(std::iter::once(&tail)) {
        let gap = scan(text, grammar, gap_start..hole.start.max(gap_start));
        let at = gap.range_start;
        masked[at..at + gap.masked.len()].copy_from_slice(&gap.masked);
        zones.extend(gap.zones);

        mask_range(&mut masked, 0, hole.clone());
        gap_start = gap_start.max(hole.end);
    }

    ZoneScan {
        zones,
        masked,
        range_start: 0,
    }
}

/// Finds the first unescaped occurrence of `needle` in `bytes[from..end]`.
fn find_terminator(bytes: &[u8], from: usize, end: usize, needle: &[u8]) -> Option<usize> {
    let mut at = from;
    while at + needle.len() <= end {
        let found = bytes[at..end]
            .windows(needle.len())
            .position(|w| w == needle)?
            + at;

        let backslashes = bytes[from..found]
            .iter()
            .rev()
            .take_while(|&&b| b == b'\\')
            .count();
        if backslashes % 2 == 0 {
            return Some(found);
        }
        at = found + 1;
    }
    None
}

fn mask(bytes: &[u8], range: Range<usize>, zones: &[Zone]) -> Vec<u8> {
    let offset = range.start;
    let mut masked = bytes[range].to_vec();
    for zone in zones {
        for b in &mut masked[zone.start - offset..zone.end - offset] {
            if *b != b'\n' {
                *b = MASK;
            }
        }
    }
    masked
}

/// Blanks `range` (host offsets) inside a mask that starts at `range_start`.
fn mask_range(masked: &mut [u8], range_start: usize, range: Range<usize>) {
    let from = range.start.saturating_sub(range_start).min(masked.len());
    let to = range.end.saturating_sub(range_start).min(masked.len());
    for b in &mut masked[from..to] {
        if *b != b'\n' {
            *b = MASK;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::LanguageRegistry;
    use proptest::prelude::*;

    fn python() -> std::sync::Arc<Grammar> {
        LanguageRegistry::with_builtin_grammars().get("python").unwrap()
    }

    fn javascript() -> std::sync::Arc<Grammar> {
        LanguageRegistry::with_builtin_grammars().get("javascript").unwrap()
    }

    fn zones_of(text: &str, grammar: &Grammar) -> Vec<(usize, usize, ZoneKind)> {
        scan(text, grammar, 0..text.len())
            .zones
            .iter()
            .map(|z| (z.start, z.end, z.kind))
            .collect()
    }

    #[test]
    fn test_escaped_quote_does_not_close() {
        let text = r#"x = "a\"b" + y"#;
        assert_eq!(zones_of(text, &python()), vec![(4, 10, ZoneKind::String)]);
    }

    #[test]
    fn test_escaped_backslash_then_quote_closes() {
        let text = r#""a\\" + 1"#;
        assert_eq!(zones_of(text, &python()), vec![(0, 5, ZoneKind::String)]);
    }

    #[test]
    fn test_unterminated_comment_runs_to_end() {
        let text = "x = 1\n# comment with no newline";
        assert_eq!(
            zones_of(text, &python()),
            vec![(6, text.len(), ZoneKind::Comment)]
        );
    }

    #[test]
    fn test_comment_includes_newline_terminator() {
        let text = "# a\nb";
        assert_eq!(zones_of(text, &python()), vec![(0, 4, ZoneKind::Comment)]);
    }

    #[test]
    fn test_triple_quote_tried_before_single() {
        let text = "s = \"\"\"one \" two\"\"\" + 'x'";
        assert_eq!(
            zones_of(text, &python()),
            vec![(4, 19, ZoneKind::String), (22, 25, ZoneKind::String)]
        );
    }

    #[test]
    fn test_comment_markers_inside_string_ignored() {
        let text = "a = '# not a comment' # real";
        assert_eq!(
            zones_of(text, &python()),
            vec![(4, 21, ZoneKind::String), (22, 28, ZoneKind::Comment)]
        );
    }

    #[test]
    fn test_block_comment() {
        let text = "a /* b\n c */ d // e\nf";
        assert_eq!(
            zones_of(text, &javascript()),
            vec![(2, 12, ZoneKind::Comment), (15, 20, ZoneKind::Comment)]
        );
    }

    #[test]
    fn test_partial_range() {
        let text = "'a' 'b' 'c'";
        let scan = scan(text, &python(), 4..8);
        assert_eq!(scan.zones.len(), 1);
        assert_eq!((scan.zones[0].start, scan.zones[0].end), (4, 7));
        assert_eq!(scan.range_start, 4);
        assert_eq!(scan.masked, b"    ".to_vec());
    }

    #[test]
    fn test_mask_preserves_length_and_newlines() {
        let text = "x = \"if\nfor\" # while\ny";
        let scan = scan(text, &python(), 0..text.len());
        assert_eq!(scan.masked.len(), text.len());
        assert_eq!(
            String::from_utf8(scan.masked).unwrap(),
            "x =    \n            \ny"
        );
    }

    #[test]
    fn test_zone_at() {
        let text = "a 'b' c 'd'";
        let scan = scan(text, &python(), 0..text.len());
        assert_eq!(scan.zone_at(3).map(|z| z.start), Some(2));
        assert!(scan.zone_at(5).is_none());
        assert!(scan.zone_at(0).is_none());
        assert_eq!(scan.zone_at(10).map(|z| z.start), Some(8));
    }

    #[test]
    fn test_multibyte_text() {
        let text = "é = 'ü' # ö";
        let scan = scan(text, &python(), 0..text.len());
        assert_eq!(scan.zones.len(), 2);
        assert!(std::str::from_utf8(&scan.masked).is_ok());
    }

    #[test]
    fn test_scan_around_stops_at_holes() {
        // the string opened before the hole ends at the hole
        let text = "a = 'x <hole 'y'> b # c";
        let scan = scan_around(text, &python(), &[7..17]);
        assert_eq!(
            scan.zones.iter().map(|z| (z.start, z.end)).collect::<Vec<_>>(),
            vec![(4, 7), (20, 23)]
        );
        assert_eq!(scan.range_start, 0);
        assert_eq!(
            String::from_utf8(scan.masked).unwrap(),
            format!("a ={}b{}", " ".repeat(15), " ".repeat(4))
        );
    }

    #[test]
    fn test_scan_around_without_holes() {
        let text = "x = 'a' # b";
        assert_eq!(scan_around(text, &python(), &[]), scan(text, &python(), 0..text.len()));
    }

    proptest! {
        #[test]
        fn prop_zones_disjoint_and_sorted(text in "[a-z \"'#\\\\\n]{0,80}") {
            let scan = scan(&text, &python(), 0..text.len());
            for pair in scan.zones.windows(2) {
                prop_assert!(pair[0].end <= pair[1].start);
            }
            for zone in &scan.zones {
                prop_assert!(zone.start < zone.end);
                prop_assert!(zone.end <= text.len());
            }
            prop_assert_eq!(scan.masked.len(), text.len());
        }
    }
}
