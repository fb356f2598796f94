//! Symbol extraction and autoindent hints.

use glint_text::PositionMapper;
use serde::Serialize;

use crate::grammar::Grammar;
use crate::zone::scan;

/// A definition line found by a struct pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Symbol {
    pub label: String,
    /// 1-based line number
    pub line: usize,
}

impl Symbol {
    pub fn new(label: impl Into<String>, line: usize) -> Self {
        Self {
            label: label.into(),
            line,
        }
    }
}

/// Returns one symbol per line matching any of the grammar's struct
/// patterns.
///
/// Patterns run over the zone-masked line, so a `def` inside a string or
/// comment is not a definition.
pub fn extract_symbols(text: &str, grammar: &Grammar) -> Vec<Symbol> {
    if grammar.struct_patterns().is_empty() {
        return Vec::new();
    }

    let masked = scan(text, grammar, 0..text.len()).masked;
    let mapper = PositionMapper::new(text);

    mapper
        .lines()
        .filter_map(|(line, start, line_text)| {
            let masked_line = &masked[start..start + line_text.len()];
            grammar
                .struct_patterns()
                .iter()
                .find_map(|pattern| pattern.find(masked_line))
                .map(|m| Symbol::new(label_for(line_text, m.end()), line))
        })
        .collect()
}

/// Builds the label of a definition line whose struct pattern match ends
/// at byte `match_end`.
fn label_for(line: &str, match_end: usize) -> String {
    let prefix = line.find('(').map_or(line, |paren| &line[..paren]);

    let name = prefix
        .get(match_end..)
        .map(trim_label)
        .filter(|rest| !rest.is_empty())
        .unwrap_or_else(|| trim_label(prefix));

    name.to_string()
}

fn trim_label(s: &str) -> &str {
    s.trim()
        .trim_end_matches(|c: char| c == ':' || c == '{' || c.is_whitespace())
}

/// True when the line before the cursor ends with the grammar's
/// autoindent trigger, ignoring trailing whitespace.
pub fn autoindent_hint(grammar: &Grammar, preceding_line: &str) -> bool {
    match grammar.autoindent_trigger() {
        Some(trigger) => preceding_line.trim_end().ends_with(trigger),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::LanguageRegistry;
    use std::sync::Arc;

    fn grammar(language: &str) -> Arc<Grammar> {
        LanguageRegistry::with_builtin_grammars().get(language).unwrap()
    }

    #[test]
    fn test_python_definition() {
        let symbols = extract_symbols("def foo(x):\n    pass\n", &grammar("python"));
        assert_eq!(symbols, vec![Symbol::new("foo", 1)]);
    }

    #[test]
    fn test_python_class_and_method() {
        let text = "class Bar:\n    def method(self):\n        pass\n";
        let symbols = extract_symbols(text, &grammar("python"));
        assert_eq!(symbols, vec![Symbol::new("Bar", 1), Symbol::new("method", 2)]);
    }

    #[test]
    fn test_definitions_in_zones_ignored() {
        let text = "x = 'def fake(y)'\n# class Nope:\ndef real():\n";
        let symbols = extract_symbols(text, &grammar("python"));
        assert_eq!(symbols, vec![Symbol::new("real", 3)]);
    }

    #[test]
    fn test_javascript_forms() {
        let text = "function add(a, b) {\n}\nvar f = function(x) {\n};\n";
        let symbols = extract_symbols(text, &grammar("javascript"));
        assert_eq!(
            symbols,
            vec![Symbol::new("add", 1), Symbol::new("var f = function", 3)]
        );
    }

    #[test]
    fn test_c_functions_and_defines() {
        let text = "#define MAX 10\nint\nmain(void)\n{\n}\n";
        let symbols = extract_symbols(text, &grammar("c"));
        assert_eq!(
            symbols,
            vec![Symbol::new("#define MAX 10", 1), Symbol::new("main", 3)]
        );
    }

    #[test]
    fn test_autoindent_hint() {
        let python = grammar("python");
        assert!(autoindent_hint(&python, "if x:"));
        assert!(autoindent_hint(&python, "    else:   "));
        assert!(!autoindent_hint(&python, "x = 1"));

        let c = grammar("c");
        assert!(autoindent_hint(&c, "int main() {"));
        assert!(!autoindent_hint(&c, "}"));

        assert!(!autoindent_hint(&grammar("baragwin"), "when x:"));
    }
}
