//! # Glint Syntax
//!
//! Lexical highlighting driven by declarative grammars: zone scanning,
//! token classification, embedded languages, brace matching and symbol
//! extraction.
//!
//! ## Why Not a Parser?
//!
//! Highlighting here never builds a tree. A grammar is a handful of
//! delimiter pairs and word lists:
//! - **Zones** (strings, comments) are found with one escape-aware sweep
//! - **Tokens** (keywords, builtins, brackets) are regex matches over the
//!   text with the zones blanked out
//! - **Markup** hosts hand their script blocks to another grammar
//!
//! That is enough for an editor to color a buffer on every keystroke, and
//! it degrades gracefully on half-typed code.
//!
//! ## Learning: Byte Offsets Everywhere
//!
//! Every span is a byte range into the `&str` it was computed from. The
//! scanners work on `&[u8]` and only cut the text at ASCII delimiters, so
//! every offset they produce is also a valid `char` boundary.

pub mod brace;
pub mod classify;
pub mod embedded;
pub mod engine;
pub mod grammar;
pub mod markup;
pub mod registry;
pub mod span;
pub mod symbols;
pub mod zone;

pub use brace::MatchResult;
pub use embedded::EmbeddedRegion;
pub use engine::{Engine, HighlightOptions};
pub use grammar::{Grammar, GrammarDefect, GrammarDescriptor, GrammarWarning, ZoneKind, ZoneRule};
pub use registry::{LanguageRegistry, Registration};
pub use span::{HighlightedSpan, Tag, TaggedSpan};
pub use symbols::Symbol;
pub use zone::Zone;

/// Result type for syntax operations
pub type SyntaxResult<T> = Result<T, SyntaxError>;

/// Errors that can occur outside of a highlight pass.
///
/// A pass itself never fails; see [`Registration::Rejected`] and
/// [`MatchResult::Lone`] for the degraded outcomes.
#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Invalid grammar descriptor: {0}")]
    Descriptor(#[from] toml::de::Error),
}
