//! Streaming tokenizer for host markup.
//!
//! Yields tags, comments and declarations one at a time without building
//! a tree. Text between tags is skipped. Raw-text elements (scripts) are
//! handled by the caller through [`MarkupTokenizer::skip_raw_text`],
//! since their content must not be read as markup.

use std::ops::Range;

/// Errors raised on malformed markup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    #[error("tag starting at {0} is never closed")]
    UnterminatedTag(usize),

    #[error("comment starting at {0} is never closed")]
    UnterminatedComment(usize),

    #[error("attribute value starting at {0} is missing its closing quote")]
    UnterminatedQuote(usize),

    #[error("<{tag}> opened at {offset} has no closing tag")]
    UnclosedElement { tag: String, offset: usize },
}

/// A `name[=value]` attribute, name lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

/// One syntactic item of the markup stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupItem {
    /// `<!-- ... -->`
    Comment(Range<usize>),

    /// `<!DOCTYPE ...>` or `<?...?>`
    Declaration(Range<usize>),

    /// `<name attr=...>`
    StartTag {
        /// Lowercased element name
        name: String,
        /// `<` through the end of the name
        head: Range<usize>,
        /// Attribute text between the name and the closing delimiter
        attributes_text: Range<usize>,
        /// `>` or `/>`
        close: Range<usize>,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },

    /// `</name>`
    EndTag { name: String, range: Range<usize> },
}

/// Iterator over the items of a markup document.
pub struct MarkupTokenizer<'a> {
    text: &'a str,
    pos: usize,
    failed: bool,
}

impl<'a> MarkupTokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            failed: false,
        }
    }

    /// Skips the raw content of `tag` that starts at the current position.
    ///
    /// Returns the content range and leaves the tokenizer on the closing
    /// tag, which is then yielded as an ordinary [`MarkupItem::EndTag`].
    pub fn skip_raw_text(&mut self, tag: &str) -> Result<Range<usize>, MarkupError> {
        let start = self.pos;
        let closing = format!("</{}", tag.to_ascii_lowercase());
        let rest = &self.text.as_bytes()[start..];

        let found = rest
            .windows(closing.len())
            .enumerate()
            .filter(|(_, w)| w.eq_ignore_ascii_case(closing.as_bytes()))
            .map(|(i, _)| start + i)
            .find(|&at| {
                // `</scripts>` does not close `<script>`
                self.text.as_bytes()
                    .get(at + closing.len())
                    .map_or(true, |b| !b.is_ascii_alphanumeric())
            });

        match found {
            Some(end) => {
                self.pos = end;
                Ok(start..end)
            }
            None => {
                self.failed = true;
                Err(MarkupError::UnclosedElement {
                    tag: tag.to_string(),
                    offset: start,
                })
            }
        }
    }

    fn find_from(&self, from: usize, needle: &str) -> Option<usize> {
        self.text[from..].find(needle).map(|i| from + i)
    }

    fn name_end(&self, from: usize) -> usize {
        self.text[from..]
            .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_' || c == ':'))
            .map_or(self.text.len(), |i| from + i)
    }

    fn read_comment(&mut self, start: usize) -> Result<MarkupItem, MarkupError> {
        // `<!-->` and `<!--->` are complete, empty comments
        let close = self
            .find_from(start + 2, "-->")
            .ok_or(MarkupError::UnterminatedComment(start))?;
        self.pos = close + 3;
        Ok(MarkupItem::Comment(start..self.pos))
    }

    fn read_declaration(&mut self, start: usize) -> Result<MarkupItem, MarkupError> {
        let close = self
            .find_from(start + 2, ">")
            .ok_or(MarkupError::UnterminatedTag(start))?;
        self.pos = close + 1;
        Ok(MarkupItem::Declaration(start..self.pos))
    }

    fn read_end_tag(&mut self, start: usize) -> Result<MarkupItem, MarkupError> {
        let name_end = self.name_end(start + 2);
        let name = self.text[start + 2..name_end].to_ascii_lowercase();
        let close = self
            .find_from(name_end, ">")
            .ok_or(MarkupError::UnterminatedTag(start))?;
        self.pos = close + 1;
        Ok(MarkupItem::EndTag {
            name,
            range: start..self.pos,
        })
    }

    fn read_start_tag(&mut self, start: usize) -> Result<MarkupItem, MarkupError> {
        let text = self.text;
        let bytes = text.as_bytes();
        let name_end = self.name_end(start + 1);
        let name = text[start + 1..name_end].to_ascii_lowercase();

        let mut attributes = Vec::new();
        let mut p = name_end;
        loop {
            while p < bytes.len() && bytes[p].is_ascii_whitespace() {
                p += 1;
            }
            match bytes.get(p) {
                None => return Err(MarkupError::UnterminatedTag(start)),
                Some(b'>') => {
                    self.pos = p + 1;
                    return Ok(MarkupItem::StartTag {
                        name,
                        head: start..name_end,
                        attributes_text: name_end..p,
                        close: p..p + 1,
                        attributes,
                        self_closing: false,
                    });
                }
                Some(b'/') if bytes.get(p + 1) == Some(&b'>') => {
                    self.pos = p + 2;
                    return Ok(MarkupItem::StartTag {
                        name,
                        head: start..name_end,
                        attributes_text: name_end..p,
                        close: p..p + 2,
                        attributes,
                        self_closing: true,
                    });
                }
                Some(_) => {
                    let (attribute, next) = self.read_attribute(p)?;
                    attributes.extend(attribute);
                    p = next;
                }
            }
        }
    }

    fn read_attribute(&self, from: usize) -> Result<(Option<Attribute>, usize), MarkupError> {
        let bytes = self.text.as_bytes();
        let is_name_byte =
            |b: u8| !(b.is_ascii_whitespace() || b == b'=' || b == b'>' || b == b'/');

        let mut p = from;
        while p < bytes.len() && is_name_byte(bytes[p]) {
            p += 1;
        }
        if p == from {
            // stray `/` or `=`
            return Ok((None, from + 1));
        }
        let name = self.text[from..p].to_ascii_lowercase();

        let mut q = p;
        while q < bytes.len() && bytes[q].is_ascii_whitespace() {
            q += 1;
        }
        if bytes.get(q) != Some(&b'=') {
            return Ok((Some(Attribute { name, value: None }), p));
        }
        q += 1;
        while q < bytes.len() && bytes[q].is_ascii_whitespace() {
            q += 1;
        }

        let (value, next) = match bytes.get(q) {
            Some(&quote @ (b'"' | b'\'')) => {
                let close = self.text[q + 1..]
                    .find(quote as char)
                    .map(|i| q + 1 + i)
                    .ok_or(MarkupError::UnterminatedQuote(q))?;
                (self.text[q + 1..close].to_string(), close + 1)
            }
            _ => {
                let mut end = q;
                while end < bytes.len() && !bytes[end].is_ascii_whitespace() && bytes[end] != b'>'
                {
                    end += 1;
                }
                (self.text[q..end].to_string(), end)
            }
        };

        Ok((
            Some(Attribute {
                name,
                value: Some(value),
            }),
            next,
        ))
    }
}

impl Iterator for MarkupTokenizer<'_> {
    type Item = Result<MarkupItem, MarkupError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let text = self.text;
        let bytes = text.as_bytes();

        loop {
            let start = self.find_from(self.pos, "<")?;
            let rest = &text[start..];

            let item = if rest.starts_with("<!--") {
                self.read_comment(start)
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.read_declaration(start)
            } else if rest.starts_with("</") {
                self.read_end_tag(start)
            } else if bytes.get(start + 1).is_some_and(|b| b.is_ascii_alphabetic()) {
                self.read_start_tag(start)
            } else {
                // a bare `<` in text
                self.pos = start + 1;
                continue;
            };

            if item.is_err() {
                self.failed = true;
            }
            return Some(item);
        }
    }
}

/// Returns the attribute named `name`, if present.
pub fn attribute<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    attributes.iter().find(|a| a.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(text: &str) -> Vec<Result<MarkupItem, MarkupError>> {
        MarkupTokenizer::new(text).collect()
    }

    #[test]
    fn test_start_and_end_tags() {
        let all = items("<p class=\"x\">hi</p>");
        assert_eq!(all.len(), 2);
        match &all[0] {
            Ok(MarkupItem::StartTag {
                name,
                head,
                attributes_text,
                close,
                attributes,
                self_closing,
            }) => {
                assert_eq!(name, "p");
                assert_eq!(head, &(0..2));
                assert_eq!(attributes_text, &(2..12));
                assert_eq!(close, &(12..13));
                assert_eq!(
                    attributes,
                    &vec![Attribute {
                        name: "class".to_string(),
                        value: Some("x".to_string())
                    }]
                );
                assert!(!self_closing);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            all[1],
            Ok(MarkupItem::EndTag {
                name: "p".to_string(),
                range: 15..19
            })
        );
    }

    #[test]
    fn test_attribute_forms() {
        let all = items("<input disabled value=42 name='a b' data-x = \"y\"/>");
        let Ok(MarkupItem::StartTag {
            attributes,
            self_closing,
            ..
        }) = &all[0]
        else {
            panic!("expected start tag");
        };
        assert!(self_closing);
        let names: Vec<_> = attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["disabled", "value", "name", "data-x"]);
        assert_eq!(attribute(attributes, "VALUE").unwrap().value.as_deref(), Some("42"));
        assert_eq!(attribute(attributes, "name").unwrap().value.as_deref(), Some("a b"));
        assert_eq!(attribute(attributes, "disabled").unwrap().value, None);
    }

    #[test]
    fn test_comments_and_declarations() {
        let all = items("<!DOCTYPE html><!-- <b> -->");
        assert_eq!(
            all,
            vec![
                Ok(MarkupItem::Declaration(0..15)),
                Ok(MarkupItem::Comment(15..27)),
            ]
        );
    }

    #[test]
    fn test_empty_comments() {
        assert_eq!(
            items("<!--><!---><!---->"),
            vec![
                Ok(MarkupItem::Comment(0..5)),
                Ok(MarkupItem::Comment(5..11)),
                Ok(MarkupItem::Comment(11..18)),
            ]
        );
    }

    #[test]
    fn test_bare_less_than_is_text() {
        let all = items("a < b <br>");
        assert_eq!(all.len(), 1);
        assert!(matches!(&all[0], Ok(MarkupItem::StartTag { name, .. }) if name == "br"));
    }

    #[test]
    fn test_errors_stop_the_stream() {
        assert_eq!(items("<p>ok</p><div"), vec![
            Ok(MarkupItem::StartTag {
                name: "p".to_string(),
                head: 0..2,
                attributes_text: 2..2,
                close: 2..3,
                attributes: Vec::new(),
                self_closing: false,
            }),
            Ok(MarkupItem::EndTag { name: "p".to_string(), range: 5..9 }),
            Err(MarkupError::UnterminatedTag(9)),
        ]);
        assert_eq!(
            items("<a href=\"x>"),
            vec![Err(MarkupError::UnterminatedQuote(8))]
        );
        assert_eq!(items("<!-- open"), vec![Err(MarkupError::UnterminatedComment(0))]);
    }

    #[test]
    fn test_skip_raw_text() {
        let text = "<script>if (a < b) x = '</p>';</SCRIPT >";
        let mut tokenizer = MarkupTokenizer::new(text);
        assert!(matches!(tokenizer.next(), Some(Ok(MarkupItem::StartTag { .. }))));
        assert_eq!(tokenizer.skip_raw_text("script"), Ok(8..30));
        assert_eq!(
            tokenizer.next(),
            Some(Ok(MarkupItem::EndTag {
                name: "script".to_string(),
                range: 30..40
            }))
        );
        assert_eq!(tokenizer.next(), None);
    }

    #[test]
    fn test_skip_raw_text_unclosed() {
        let mut tokenizer = MarkupTokenizer::new("<script>var x;");
        tokenizer.next();
        assert_eq!(
            tokenizer.skip_raw_text("script"),
            Err(MarkupError::UnclosedElement {
                tag: "script".to_string(),
                offset: 8
            })
        );
        assert_eq!(tokenizer.next(), None);
    }
}
