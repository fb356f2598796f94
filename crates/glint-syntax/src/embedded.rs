//! Embedded language extractor for host markup.
//!
//! Walks the markup stream once and records, for every script container,
//! the byte range of its content together with the language that should
//! highlight it. The same walk yields the host's own tag and comment
//! spans.
//!
//! Malformed markup never fails the pass: the walk stops at the first
//! error, keeps what it found before it and logs a warning.

use std::ops::Range;

use crate::grammar::{Grammar, MarkupSettings};
use crate::markup::{attribute, Attribute, MarkupError, MarkupItem, MarkupTokenizer};
use crate::registry::LanguageRegistry;
use crate::span::{Tag, TaggedSpan};

/// A host range whose content belongs to another grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmbeddedRegion {
    pub language: String,
    pub host_start: usize,
    pub host_end: usize,
}

impl EmbeddedRegion {
    pub fn range(&self) -> Range<usize> {
        self.host_start..self.host_end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.host_start <= offset && offset < self.host_end
    }
}

/// Everything one walk over a markup host produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupScan {
    /// Script regions in document order
    pub regions: Vec<EmbeddedRegion>,

    /// Tag and comment spans of the host itself
    pub host_spans: Vec<TaggedSpan>,

    /// Content of every script element, opaque ones included
    pub script_contents: Vec<Range<usize>>,

    /// Set when the walk stopped early on malformed markup
    pub error: Option<MarkupError>,
}

/// Returns the embedded regions of `text`.
///
/// Empty for hosts that are not markup grammars.
pub fn extract(text: &str, host: &Grammar, registry: &LanguageRegistry) -> Vec<EmbeddedRegion> {
    scan_markup(text, host, registry).regions
}

/// Walks a markup host, collecting script regions and host spans.
pub fn scan_markup(text: &str, host: &Grammar, registry: &LanguageRegistry) -> MarkupScan {
    let mut scan = MarkupScan::default();
    let Some(settings) = host.markup() else {
        return scan;
    };

    let mut tokenizer = MarkupTokenizer::new(text);
    while let Some(item) = tokenizer.next() {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                scan.error = Some(e);
                break;
            }
        };

        match item {
            MarkupItem::Comment(range) => {
                scan.host_spans.push(TaggedSpan::new(range.start, range.end, Tag::Comment));
            }
            MarkupItem::Declaration(range) | MarkupItem::EndTag { range, .. } => {
                scan.host_spans.push(TaggedSpan::new(range.start, range.end, Tag::Keyword));
            }
            MarkupItem::StartTag {
                name,
                head,
                attributes_text,
                close,
                attributes,
                self_closing,
            } => {
                scan.host_spans.push(TaggedSpan::new(head.start, head.end, Tag::Keyword));
                if !attributes_text.is_empty() {
                    scan.host_spans.push(TaggedSpan::new(
                        attributes_text.start,
                        attributes_text.end,
                        Tag::Comment,
                    ));
                }
                scan.host_spans.push(TaggedSpan::new(close.start, close.end, Tag::Keyword));

                if self_closing || !name.eq_ignore_ascii_case(&settings.script_tag) {
                    continue;
                }
                let content = match tokenizer.skip_raw_text(&name) {
                    Ok(content) => content,
                    Err(e) => {
                        scan.error = Some(e);
                        break;
                    }
                };
                if content.is_empty() {
                    continue;
                }
                scan.script_contents.push(content.clone());
                if let Some(language) = script_language(&attributes, settings, registry) {
                    scan.regions.push(EmbeddedRegion {
                        language,
                        host_start: content.start,
                        host_end: content.end,
                    });
                }
            }
        }
    }

    if let Some(error) = &scan.error {
        tracing::warn!(
            "Malformed {} markup, keeping {} region(s) found before it: {}",
            host.language(),
            scan.regions.len(),
            error
        );
    }
    scan
}

/// Picks the grammar for a script element, or `None` when its content is
/// external or written in an unknown language.
fn script_language(
    attributes: &[Attribute],
    settings: &MarkupSettings,
    registry: &LanguageRegistry,
) -> Option<String> {
    if attribute(attributes, &settings.source_attribute).is_some() {
        return None;
    }

    match attribute(attributes, &settings.type_attribute) {
        Some(declared) => {
            let mime = declared.value.as_deref().unwrap_or_default();
            let grammar = registry.resolve_by_mime(mime);
            if grammar.is_none() {
                tracing::debug!("Script type {:?} is not registered, leaving it opaque", mime);
            }
            grammar.map(|g| g.language().to_string())
        }
        None => registry
            .get(&settings.default_script_language)
            .map(|g| g.language().to_string()),
    }
}
