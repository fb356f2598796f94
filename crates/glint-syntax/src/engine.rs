//! The engine facade: highlight, brace match, symbols and autoindent.
//!
//! ## Pass Pipeline
//!
//! ```text
//! text ──▶ Zone Scanner ──▶ masked text ──▶ Token Classifier ──┐
//!   │                                                          ├──▶ spans
//!   └──▶ (markup host) Extractor ──▶ regions ──▶ recurse ──────┘
//! ```
//!
//! Spans are returned in application order: zones, classifier rules,
//! markup host tags, embedded regions, then overlong-line markers. When two
//! spans overlap, the later one decides the rendered tag.

use std::sync::Arc;
use std::time::Instant;

use glint_text::PositionMapper;

use crate::brace::{match_brace, MatchResult};
use crate::classify::{classify, mark_overlong_lines, DEFAULT_OVERLONG_LIMIT};
use crate::embedded::scan_markup;
use crate::grammar::Grammar;
use crate::registry::LanguageRegistry;
use crate::span::{HighlightedSpan, TaggedSpan};
use crate::symbols::{autoindent_hint, extract_symbols, Symbol};
use crate::zone::{scan, scan_around};
use crate::{SyntaxError, SyntaxResult};

/// Nesting limit for markup embedded in markup.
pub const MAX_EMBED_DEPTH: usize = 4;

/// Tunables of a highlight pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightOptions {
    /// Lines longer than this many characters get a `too_long` tail
    pub overlong_line_limit: usize,
    pub mark_overlong_lines: bool,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            overlong_line_limit: DEFAULT_OVERLONG_LIMIT,
            mark_overlong_lines: true,
        }
    }
}

/// Stateless analysis entry points over a shared registry.
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<LanguageRegistry>,
    options: HighlightOptions,
}

impl Engine {
    pub fn new(registry: Arc<LanguageRegistry>) -> Self {
        Self {
            registry,
            options: HighlightOptions::default(),
        }
    }

    /// Creates an engine over the builtin grammars.
    pub fn with_builtin_grammars() -> Self {
        Self::new(Arc::new(LanguageRegistry::with_builtin_grammars()))
    }

    pub fn with_options(mut self, options: HighlightOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Arc<LanguageRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &HighlightOptions {
        &self.options
    }

    /// Resolves a language id or file extension.
    pub fn grammar(&self, key: &str) -> SyntaxResult<Arc<Grammar>> {
        self.registry
            .resolve(key)
            .ok_or_else(|| SyntaxError::UnknownLanguage(key.to_string()))
    }

    // ==================== Highlighting ====================

    /// Highlights `text`, returning spans with line/column endpoints.
    ///
    /// An unknown language yields no spans.
    pub fn highlight(&self, text: &str, language: &str) -> Vec<HighlightedSpan> {
        let spans = self.highlight_spans(text, language);
        let mapper = PositionMapper::new(text);
        spans
            .into_iter()
            .map(|span| HighlightedSpan {
                span,
                from: mapper.offset_to_coord(span.start),
                to: mapper.offset_to_coord(span.end),
            })
            .collect()
    }

    /// Highlights `text`, returning byte-offset spans only.
    pub fn highlight_spans(&self, text: &str, language: &str) -> Vec<TaggedSpan> {
        let grammar = match self.grammar(language) {
            Ok(grammar) => grammar,
            Err(e) => {
                tracing::debug!("Skipping highlight: {}", e);
                return Vec::new();
            }
        };

        let started = Instant::now();
        let mut spans = self.spans_for(text, &grammar, 0);
        if self.options.mark_overlong_lines {
            spans.extend(mark_overlong_lines(text, self.options.overlong_line_limit));
        }

        tracing::debug!(
            "Highlighted {} bytes of {} into {} spans in {:?}",
            text.len(),
            grammar.language(),
            spans.len(),
            started.elapsed()
        );
        spans
    }

    fn spans_for(&self, text: &str, grammar: &Grammar, depth: usize) -> Vec<TaggedSpan> {
        if !grammar.is_markup() || depth >= MAX_EMBED_DEPTH {
            let zone_scan = scan(text, grammar, 0..text.len());
            let mut spans: Vec<TaggedSpan> = zone_scan.spans().collect();
            spans.extend(classify(&zone_scan.masked, grammar, 0));
            return spans;
        }

        // Host rules only ever see host text, never script content
        let markup = scan_markup(text, grammar, &self.registry);
        let zone_scan = scan_around(text, grammar, &markup.script_contents);
        let mut spans: Vec<TaggedSpan> = zone_scan.spans().collect();
        spans.extend(classify(&zone_scan.masked, grammar, 0));
        spans.extend(markup.host_spans);

        for region in &markup.regions {
            let Some(sub) = self.registry.get(&region.language) else {
                continue;
            };
            let slice = &text[region.range()];
            spans.extend(
                self.spans_for(slice, &sub, depth + 1)
                    .into_iter()
                    .map(|s| s.shifted(region.host_start)),
            );
        }
        spans
    }

    // ==================== Navigation ====================

    /// Matches the bracket next to `cursor`.
    ///
    /// In a markup host the match runs inside the embedded region holding
    /// the cursor, with that region's grammar.
    pub fn match_brace(&self, text: &str, cursor: usize, language: &str) -> MatchResult {
        let Ok(grammar) = self.grammar(language) else {
            return MatchResult::None;
        };

        if grammar.is_markup() {
            let markup = scan_markup(text, &grammar, &self.registry);
            let region = markup
                .regions
                .iter()
                .find(|r| r.host_start <= cursor && cursor <= r.host_end);
            if let Some(region) = region {
                let Some(sub) = self.registry.get(&region.language) else {
                    return MatchResult::None;
                };
                let slice = &text[region.range()];
                let zones = scan(slice, &sub, 0..slice.len()).zones;
                return match_brace(slice, &zones, cursor - region.host_start, &sub)
                    .shifted(region.host_start);
            }
            // Brackets inside scripts do not exist for the host
            let host = scan_around(text, &grammar, &markup.script_contents);
            return match std::str::from_utf8(&host.masked) {
                Ok(masked) => match_brace(masked, &host.zones, cursor, &grammar),
                Err(_) => MatchResult::None,
            };
        }

        let zones = scan(text, &grammar, 0..text.len()).zones;
        match_brace(text, &zones, cursor, &grammar)
    }

    /// Lists definition lines, per embedded region for a markup host.
    pub fn extract_symbols(&self, text: &str, language: &str) -> Vec<Symbol> {
        let Ok(grammar) = self.grammar(language) else {
            return Vec::new();
        };
        if !grammar.is_markup() {
            return extract_symbols(text, &grammar);
        }

        let mapper = PositionMapper::new(text);
        let markup = scan_markup(text, &grammar, &self.registry);
        let mut symbols = Vec::new();
        for region in &markup.regions {
            let Some(sub) = self.registry.get(&region.language) else {
                continue;
            };
            let first_line = mapper.offset_to_coord(region.host_start).line;
            symbols.extend(
                extract_symbols(&text[region.range()], &sub)
                    .into_iter()
                    .map(|s| Symbol::new(s.label, s.line + first_line - 1)),
            );
        }
        symbols
    }

    /// True when a new line after `preceding_line` should be indented.
    pub fn autoindent_hint(&self, language: &str, preceding_line: &str) -> bool {
        self.grammar(language)
            .map(|grammar| autoindent_hint(&grammar, preceding_line))
            .unwrap_or(false)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_builtin_grammars()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarDescriptor;
    use crate::span::Tag;
    use glint_text::Coordinate;
    use proptest::prelude::*;

    fn tagged(engine: &Engine, text: &str, language: &str) -> Vec<(String, Tag)> {
        engine
            .highlight_spans(text, language)
            .into_iter()
            .map(|s| (text[s.start..s.end].to_string(), s.tag))
            .collect()
    }

    #[test]
    fn test_zones_then_classifier() {
        let engine = Engine::default();
        let spans = tagged(&engine, "if x: # note\n    y = 'z'", "python");
        assert_eq!(
            spans,
            vec![
                ("# note\n".to_string(), Tag::Comment),
                ("'z'".to_string(), Tag::String),
                ("if".to_string(), Tag::Keyword),
            ]
        );
    }

    #[test]
    fn test_unknown_language() {
        let engine = Engine::default();
        assert!(engine.highlight("anything", "cobol").is_empty());
        assert!(matches!(
            engine.grammar("cobol"),
            Err(SyntaxError::UnknownLanguage(ref l)) if l == "cobol"
        ));
        assert_eq!(engine.match_brace("()", 0, "cobol"), MatchResult::None);
        assert!(engine.extract_symbols("def f():", "cobol").is_empty());
        assert!(!engine.autoindent_hint("cobol", "x:"));
    }

    #[test]
    fn test_language_by_extension() {
        let engine = Engine::default();
        assert_eq!(
            engine.highlight_spans("def", ".py"),
            vec![TaggedSpan::new(0, 3, Tag::Keyword)]
        );
    }

    #[test]
    fn test_coordinates() {
        let engine = Engine::default();
        let spans = engine.highlight("x = 1\ny = 'ab'", "python");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].span.tag, Tag::String);
        assert_eq!(spans[0].from, Coordinate::new(2, 4));
        assert_eq!(spans[0].to, Coordinate::new(2, 8));
    }

    #[test]
    fn test_embedded_offsets_are_host_offsets() {
        let engine = Engine::default();
        let text = "<script>var x=1;</script>";
        let spans = engine.highlight_spans(text, "html");
        assert!(spans.contains(&TaggedSpan::new(8, 11, Tag::Keyword)));
        assert_eq!(&text[8..11], "var");
    }

    #[test]
    fn test_markup_host_and_embedded_spans() {
        let engine = Engine::default();
        let text = "<!-- c --><script type=\"text/python\">x = 'if'</script>";
        let spans = tagged(&engine, text, "html");
        assert_eq!(
            spans,
            vec![
                ("<!-- c -->".to_string(), Tag::Comment),
                ("<script".to_string(), Tag::Keyword),
                (" type=\"text/python\"".to_string(), Tag::Comment),
                (">".to_string(), Tag::Keyword),
                ("</script>".to_string(), Tag::Keyword),
                ("'if'".to_string(), Tag::String),
            ]
        );
    }

    fn xmlish() -> Engine {
        let mut registry = LanguageRegistry::with_builtin_grammars();
        let descriptor = GrammarDescriptor::from_toml(
            r#"
            language = "xmlish"
            extensions = ["xmlish"]
            keywords = ["if"]
            zones = [{ start = "<!--", end = "-->", kind = "comment" }]

            [markup]
            "#,
        )
        .unwrap();
        assert!(registry.register(descriptor).is_registered());
        Engine::new(Arc::new(registry))
    }

    #[test]
    fn test_host_zones_stay_out_of_scripts() {
        let engine = xmlish();
        let text = "<script>var s = '<!--';</script><p>visible text</p>";
        let visible = text.find("visible").unwrap();
        let spans = engine.highlight_spans(text, "xmlish");

        assert!(spans.iter().all(|s| !(s.start <= visible && visible < s.end)));
        assert!(spans.contains(&TaggedSpan::new(16, 22, Tag::String)));
        assert!(spans.iter().all(|s| s.tag != Tag::Comment));
    }

    #[test]
    fn test_opaque_script_not_host_classified() {
        let engine = xmlish();
        let text = "<p>if</p><script type=\"text/template\">if (x)</script>";
        let spans = tagged(&engine, text, "xmlish");
        let keywords: Vec<_> = spans
            .iter()
            .filter(|(s, tag)| *tag == Tag::Keyword && s == "if")
            .collect();
        assert_eq!(keywords.len(), 1);
        assert!(engine
            .highlight_spans(text, "xmlish")
            .contains(&TaggedSpan::new(3, 5, Tag::Keyword)));
        assert_eq!(engine.match_brace(text, 41, "xmlish"), MatchResult::None);
    }

    #[test]
    fn test_malformed_markup_does_not_fail() {
        let engine = Engine::default();
        let spans = engine.highlight_spans("<script>var a;</script><div class=\"", "html");
        assert!(spans.contains(&TaggedSpan::new(8, 11, Tag::Keyword)));
    }

    #[test]
    fn test_overlong_marker_last() {
        let engine = Engine::default();
        let text = format!("if {}", "x".repeat(90));
        let spans = engine.highlight_spans(&text, "python");
        assert_eq!(spans.last(), Some(&TaggedSpan::new(78, 93, Tag::TooLong)));

        let quiet = Engine::default().with_options(HighlightOptions {
            mark_overlong_lines: false,
            ..HighlightOptions::default()
        });
        assert!(quiet
            .highlight_spans(&text, "python")
            .iter()
            .all(|s| s.tag != Tag::TooLong));
    }

    #[test]
    fn test_match_brace() {
        let engine = Engine::default();
        assert_eq!(
            engine.match_brace("(a + b", 0, "python"),
            MatchResult::Lone { offset: 0 }
        );
        let text = "<p>(</p><script>f(a, [b])</script>";
        assert_eq!(
            engine.match_brace(text, 17, "html"),
            MatchResult::Matched { open: 17, close: 24 }
        );
        assert_eq!(engine.match_brace(text, 3, "html"), MatchResult::None);
    }

    #[test]
    fn test_symbols_in_markup() {
        let engine = Engine::default();
        let text = "<html>\n<script>\nfunction a() {}\n</script>\n\
                    <script type=\"text/python\">\n\ndef b(): pass\n</script>";
        assert_eq!(
            engine.extract_symbols(text, "html"),
            vec![Symbol::new("a", 3), Symbol::new("b", 7)]
        );
    }

    #[test]
    fn test_symbol_label_stops_at_paren() {
        let engine = Engine::default();
        assert_eq!(
            engine.extract_symbols("def foo(x):\n    pass\n", "python"),
            vec![Symbol::new("foo", 1)]
        );
    }

    #[test]
    fn test_autoindent() {
        let engine = Engine::default();
        assert!(engine.autoindent_hint("python", "for i in x:  "));
        assert!(engine.autoindent_hint("js", "if (a) {"));
        assert!(!engine.autoindent_hint("python", "pass"));
    }

    proptest! {
        #[test]
        fn prop_highlight_is_idempotent(text in "[a-z (){}\\[\\]'\"#\n]{0,120}") {
            let engine = Engine::default();
            prop_assert_eq!(
                engine.highlight(&text, "python"),
                engine.highlight(&text, "python")
            );
        }

        #[test]
        fn prop_spans_within_text(text in "[a-z <>/=\"'!-]{0,120}") {
            let engine = Engine::default();
            for span in engine.highlight_spans(&text, "html") {
                prop_assert!(span.start <= span.end);
                prop_assert!(span.end <= text.len());
            }
        }
    }
}
