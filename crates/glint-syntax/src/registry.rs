//! Language registry: grammars by id, extension and script mime type.
//!
//! ## Learning: Shared Immutable Data
//!
//! Compiled grammars are wrapped in `Arc`. Once registered they are never
//! mutated, so every session can hold a clone of the `Arc` without any
//! locking. Reloading a grammar swaps the `Arc` in the map; sessions that
//! still hold the old one finish their pass with it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::grammar::{normalize_extension, Grammar, GrammarDescriptor, GrammarWarning};

/// Outcome of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The grammar is now active under this language id
    Registered(String),
    /// The descriptor was invalid; its extensions stay unhighlighted
    Rejected(GrammarWarning),
}

impl Registration {
    pub fn is_registered(&self) -> bool {
        matches!(self, Registration::Registered(_))
    }
}

/// All grammars known to the engine.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    grammars: HashMap<String, Arc<Grammar>>,
    by_extension: HashMap<String, String>,
    by_mime: HashMap<String, String>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the grammars shipped with the crate.
    pub fn with_builtin_grammars() -> Self {
        let mut registry = Self::new();
        for descriptor in GrammarDescriptor::builtin() {
            registry.register(descriptor);
        }
        registry
    }

    /// Validates and registers a descriptor.
    ///
    /// Registering an extension or mime type that is already mapped moves
    /// it to the new grammar (last registration wins), which is what makes
    /// runtime reloads work.
    pub fn register(&mut self, descriptor: GrammarDescriptor) -> Registration {
        let grammar = match Grammar::compile(descriptor) {
            Ok(grammar) => Arc::new(grammar),
            Err(warning) => {
                tracing::warn!("{}", warning);
                return Registration::Rejected(warning);
            }
        };

        let id = grammar.language().to_string();
        for ext in grammar.extensions() {
            if let Some(previous) = self.by_extension.insert(ext.clone(), id.clone()) {
                if previous != id {
                    tracing::debug!("Extension .{} moved from {} to {}", ext, previous, id);
                }
            }
        }
        for mime in grammar.script_types() {
            self.by_mime.insert(mime.clone(), id.clone());
        }
        if self.grammars.insert(id.clone(), grammar).is_some() {
            tracing::info!("Reloaded grammar {}", id);
        } else {
            tracing::debug!("Registered grammar {}", id);
        }

        Registration::Registered(id)
    }

    /// Returns a grammar by language id.
    pub fn get(&self, language: &str) -> Option<Arc<Grammar>> {
        self.grammars.get(language).cloned()
    }

    /// Returns the grammar mapped to a file extension (dot optional).
    pub fn resolve_by_extension(&self, ext: &str) -> Option<Arc<Grammar>> {
        self.by_extension
            .get(&normalize_extension(ext))
            .and_then(|id| self.get(id))
    }

    /// Returns the grammar declaring a script mime type.
    pub fn resolve_by_mime(&self, mime: &str) -> Option<Arc<Grammar>> {
        self.by_mime
            .get(&mime.trim().to_ascii_lowercase())
            .and_then(|id| self.get(id))
    }

    /// Resolves a language id first, then an extension.
    pub fn resolve(&self, key: &str) -> Option<Arc<Grammar>> {
        self.get(key).or_else(|| self.resolve_by_extension(key))
    }

    /// Returns the registered language ids, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.grammars.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarDefect, ZoneKind, ZoneRule};

    fn descriptor(language: &str, ext: &str) -> GrammarDescriptor {
        GrammarDescriptor {
            language: Some(language.to_string()),
            extensions: Some(vec![ext.to_string()]),
            zones: Some(vec![ZoneRule::new("#", "\n", ZoneKind::Comment)]),
            ..Default::default()
        }
    }

    #[test]
    fn test_builtin_registry() {
        let registry = LanguageRegistry::with_builtin_grammars();
        assert_eq!(
            registry.languages(),
            vec!["baragwin", "c", "html", "javascript", "python"]
        );
        assert_eq!(registry.resolve_by_extension(".py").unwrap().language(), "python");
        assert_eq!(registry.resolve_by_extension("H").unwrap().language(), "c");
        assert_eq!(
            registry.resolve_by_mime("Text/Python3").unwrap().language(),
            "python"
        );
        assert!(registry.resolve_by_mime("text/unknown").is_none());
    }

    #[test]
    fn test_resolve_accepts_id_or_extension() {
        let registry = LanguageRegistry::with_builtin_grammars();
        assert_eq!(registry.resolve("javascript").unwrap().language(), "javascript");
        assert_eq!(registry.resolve("ts").unwrap().language(), "javascript");
        assert!(registry.resolve("cobol").is_none());
    }

    #[test]
    fn test_rejected_grammar_leaves_extension_unmapped() {
        let mut registry = LanguageRegistry::new();
        let mut d = descriptor("broken", "brk");
        d.zones = None;

        let outcome = registry.register(d);
        assert!(matches!(
            outcome,
            Registration::Rejected(ref w) if w.defect == GrammarDefect::MissingField("zones")
        ));
        assert!(registry.resolve_by_extension("brk").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = LanguageRegistry::new();
        assert!(registry.register(descriptor("first", "x")).is_registered());
        assert!(registry.register(descriptor("second", "x")).is_registered());
        assert_eq!(registry.resolve_by_extension("x").unwrap().language(), "second");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_reload_replaces_grammar() {
        let mut registry = LanguageRegistry::new();
        registry.register(descriptor("lang", "l"));
        let before = registry.get("lang").unwrap();

        let mut updated = descriptor("lang", "l");
        updated.keywords = vec!["print".to_string()];
        registry.register(updated);

        let after = registry.get("lang").unwrap();
        assert!(before.keywords().is_empty());
        assert_eq!(after.keywords(), ["print"]);
        assert_eq!(registry.len(), 1);
    }
}
