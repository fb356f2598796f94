//! Declarative grammar descriptors and their compiled form.
//!
//! ## Learning: Serde for Serialization
//!
//! `GrammarDescriptor` is what a TOML file deserializes into. Required
//! fields are `Option`s so a missing one can be reported as a warning
//! instead of failing the whole parse; everything else uses
//! `#[serde(default)]`.
//!
//! ## Descriptor → Grammar
//!
//! ```text
//! GrammarDescriptor ──validate──▶ Grammar
//!   keywords       ──────────────▶ keyword union   \bif\b|\bfor\b|...
//!   builtins       ──────────────▶ builtin union
//!   brackets "()[]{}" ───────────▶ one class pattern per family
//!   zones          ──sort────────▶ longest start delimiter first
//! ```

use regex::bytes::Regex as BytesRegex;
use serde::{Deserialize, Serialize};

use crate::span::Tag;

const BUILTIN_DESCRIPTORS: &[(&str, &str)] = &[
    ("python", include_str!("../languages/python.toml")),
    ("javascript", include_str!("../languages/javascript.toml")),
    ("c", include_str!("../languages/c.toml")),
    ("baragwin", include_str!("../languages/baragwin.toml")),
    ("html", include_str!("../languages/html.toml")),
];

/// Kind of a lexical zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    String,
    Comment,
}

impl ZoneKind {
    /// Returns the tag a zone of this kind is rendered with.
    pub fn tag(self) -> Tag {
        match self {
            ZoneKind::String => Tag::String,
            ZoneKind::Comment => Tag::Comment,
        }
    }
}

/// A `(start, end, kind)` zone delimiter triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRule {
    pub start: String,
    pub end: String,
    pub kind: ZoneKind,
}

impl ZoneRule {
    pub fn new(start: impl Into<String>, end: impl Into<String>, kind: ZoneKind) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            kind,
        }
    }
}

/// Settings that make a grammar a host markup language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupSettings {
    /// Element whose content is written in a script language
    pub script_tag: String,

    /// Attribute naming the script mime type
    pub type_attribute: String,

    /// Attribute referencing an external script
    pub source_attribute: String,

    /// Language used when the type attribute is absent
    pub default_script_language: String,
}

impl Default for MarkupSettings {
    fn default() -> Self {
        Self {
            script_tag: "script".to_string(),
            type_attribute: "type".to_string(),
            source_attribute: "src".to_string(),
            default_script_language: "javascript".to_string(),
        }
    }
}

fn default_brackets() -> String {
    "()[]{}".to_string()
}

/// A grammar as written in a descriptor file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarDescriptor {
    pub language: Option<String>,

    pub extensions: Option<Vec<String>>,

    #[serde(default)]
    pub script_types: Vec<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub builtins: Vec<String>,

    pub zones: Option<Vec<ZoneRule>>,

    /// Bracket characters as consecutive open/close pairs
    #[serde(default = "default_brackets")]
    pub brackets: String,

    #[serde(default)]
    pub struct_patterns: Vec<String>,

    #[serde(default)]
    pub autoindent_trigger: Option<char>,

    #[serde(default)]
    pub markup: Option<MarkupSettings>,
}

impl Default for GrammarDescriptor {
    fn default() -> Self {
        Self {
            language: None,
            extensions: None,
            script_types: Vec::new(),
            keywords: Vec::new(),
            builtins: Vec::new(),
            zones: None,
            brackets: default_brackets(),
            struct_patterns: Vec::new(),
            autoindent_trigger: None,
            markup: None,
        }
    }
}

impl GrammarDescriptor {
    /// Parses a descriptor from TOML text.
    pub fn from_toml(source: &str) -> crate::SyntaxResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Returns the descriptors shipped with the crate.
    pub fn builtin() -> Vec<GrammarDescriptor> {
        BUILTIN_DESCRIPTORS
            .iter()
            .filter_map(|(name, source)| match Self::from_toml(source) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    tracing::warn!("Builtin grammar {} failed to parse: {}", name, e);
                    None
                }
            })
            .collect()
    }
}

/// Why a descriptor could not be registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarDefect {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("zone delimiters must not be empty")]
    EmptyDelimiter,

    #[error("bracket characters must come in open/close pairs")]
    UnpairedBrackets,

    #[error("pattern {pattern:?} does not compile: {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// A rejected registration: non-fatal, the language stays unhighlighted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("grammar {} rejected: {defect}", .language.as_deref().unwrap_or("<unnamed>"))]
pub struct GrammarWarning {
    pub language: Option<String>,
    pub defect: GrammarDefect,
}

/// One classifier rule: every match of `pattern` is tagged `tag`.
#[derive(Debug, Clone)]
pub struct TokenRule {
    pub pattern: BytesRegex,
    pub tag: Tag,
}

/// A validated grammar with precompiled patterns. Immutable once built.
#[derive(Debug, Clone)]
pub struct Grammar {
    language: String,
    extensions: Vec<String>,
    script_types: Vec<String>,
    keywords: Vec<String>,
    builtins: Vec<String>,
    zones: Vec<ZoneRule>,
    bracket_pairs: Vec<(char, char)>,
    struct_patterns: Vec<BytesRegex>,
    autoindent_trigger: Option<char>,
    markup: Option<MarkupSettings>,
    rules: Vec<TokenRule>,
}

impl Grammar {
    /// Validates a descriptor and compiles its patterns.
    pub fn compile(descriptor: GrammarDescriptor) -> Result<Self, GrammarWarning> {
        let language = descriptor.language.clone();
        let warn = |defect| GrammarWarning {
            language: language.clone(),
            defect,
        };

        let id = descriptor
            .language
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| warn(GrammarDefect::MissingField("language")))?;
        let extensions: Vec<String> = descriptor
            .extensions
            .ok_or_else(|| warn(GrammarDefect::MissingField("extensions")))?
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| !e.is_empty())
            .collect();
        if extensions.is_empty() {
            return Err(warn(GrammarDefect::MissingField("extensions")));
        }
        let mut zones = descriptor
            .zones
            .ok_or_else(|| warn(GrammarDefect::MissingField("zones")))?;
        if zones.iter().any(|z| z.start.is_empty() || z.end.is_empty()) {
            return Err(warn(GrammarDefect::EmptyDelimiter));
        }
        // Longest delimiter first so `"""` is tried before `"`
        zones.sort_by(|a, b| b.start.len().cmp(&a.start.len()));

        let bracket_chars: Vec<char> = descriptor.brackets.chars().collect();
        if bracket_chars.len() % 2 != 0 {
            return Err(warn(GrammarDefect::UnpairedBrackets));
        }
        let bracket_pairs: Vec<(char, char)> =
            bracket_chars.chunks(2).map(|p| (p[0], p[1])).collect();

        let compile = |pattern: &str| {
            BytesRegex::new(pattern).map_err(|e| {
                warn(GrammarDefect::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })
            })
        };

        let struct_patterns = descriptor
            .struct_patterns
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>, _>>()?;

        let mut rules = Vec::new();
        if let Some(pattern) = union_pattern(&descriptor.keywords) {
            rules.push(TokenRule {
                pattern: compile(&pattern)?,
                tag: Tag::Keyword,
            });
        }
        if let Some(pattern) = union_pattern(&descriptor.builtins) {
            rules.push(TokenRule {
                pattern: compile(&pattern)?,
                tag: Tag::Builtin,
            });
        }
        for tag in [Tag::SquareBracket, Tag::Parenthesis, Tag::CurlyBrace] {
            let family: Vec<&(char, char)> = bracket_pairs
                .iter()
                .filter(|(open, _)| Tag::for_bracket(*open) == Some(tag))
                .collect();
            if family.is_empty() {
                continue;
            }
            let class: String = family
                .iter()
                .flat_map(|(open, close)| [*open, *close])
                .map(|c| regex::escape(&c.to_string()))
                .collect();
            rules.push(TokenRule {
                pattern: compile(&format!("[{class}]"))?,
                tag,
            });
        }

        Ok(Self {
            language: id,
            extensions,
            script_types: descriptor
                .script_types
                .iter()
                .map(|m| m.trim().to_ascii_lowercase())
                .collect(),
            keywords: descriptor.keywords,
            builtins: descriptor.builtins,
            zones,
            bracket_pairs,
            struct_patterns,
            autoindent_trigger: descriptor.autoindent_trigger,
            markup: descriptor.markup,
            rules,
        })
    }

    // ==================== Getters ====================

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn script_types(&self) -> &[String] {
        &self.script_types
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn builtins(&self) -> &[String] {
        &self.builtins
    }

    /// Zone rules, longest start delimiter first.
    pub fn zones(&self) -> &[ZoneRule] {
        &self.zones
    }

    pub fn bracket_pairs(&self) -> &[(char, char)] {
        &self.bracket_pairs
    }

    pub fn struct_patterns(&self) -> &[BytesRegex] {
        &self.struct_patterns
    }

    pub fn autoindent_trigger(&self) -> Option<char> {
        self.autoindent_trigger
    }

    /// Markup settings; `Some` for host markup languages.
    pub fn markup(&self) -> Option<&MarkupSettings> {
        self.markup.as_ref()
    }

    pub fn is_markup(&self) -> bool {
        self.markup.is_some()
    }

    /// Classifier rules in application order.
    pub fn token_rules(&self) -> &[TokenRule] {
        &self.rules
    }

    /// For a bracket character, returns its counterpart and whether it
    /// opens a pair.
    pub fn bracket_partner(&self, c: char) -> Option<(char, bool)> {
        self.bracket_pairs.iter().find_map(|&(open, close)| {
            if c == open {
                Some((close, true))
            } else if c == close {
                Some((open, false))
            } else {
                None
            }
        })
    }
}

/// Lowercases an extension and strips its leading dot.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Builds `\bw1\b|\bw2\b|...`, or `None` for an empty word list.
///
/// A word edge that is not a word character (`#include`) gets no boundary
/// assertion on that side, otherwise it could never match.
fn union_pattern(words: &[String]) -> Option<String> {
    let mut words: Vec<&str> = words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return None;
    }
    words.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    words.dedup();

    let alternatives: Vec<String> = words
        .iter()
        .map(|word| {
            let lead = word.chars().next().is_some_and(is_word_char);
            let tail = word.chars().last().is_some_and(is_word_char);
            format!(
                "{}{}{}",
                if lead { r"\b" } else { "" },
                regex::escape(word),
                if tail { r"\b" } else { "" },
            )
        })
        .collect();
    Some(alternatives.join("|"))
}
