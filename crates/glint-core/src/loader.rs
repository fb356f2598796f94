//! Builds a language registry from the configured grammar sources.

use std::path::{Path, PathBuf};

use glint_syntax::{GrammarDescriptor, GrammarWarning, LanguageRegistry, Registration};

use crate::config::GrammarConfig;
use crate::CoreResult;

/// What a registry build registered and what it had to skip.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Language ids, in registration order
    pub registered: Vec<String>,

    /// Descriptors that parsed but failed validation
    pub rejected: Vec<GrammarWarning>,

    /// Files that could not be read or parsed, with the reason
    pub unreadable: Vec<(PathBuf, String)>,
}

impl LoadReport {
    fn record(&mut self, outcome: Registration) {
        match outcome {
            Registration::Registered(id) => self.registered.push(id),
            Registration::Rejected(warning) => self.rejected.push(warning),
        }
    }
}

/// Builds a registry: builtins first (if enabled), then every configured
/// directory in order. Later registrations override earlier ones.
pub fn build_registry(config: &GrammarConfig) -> (LanguageRegistry, LoadReport) {
    let mut registry = LanguageRegistry::new();
    let mut report = LoadReport::default();

    if config.load_builtin {
        for descriptor in GrammarDescriptor::builtin() {
            report.record(registry.register(descriptor));
        }
    }

    for dir in &config.directories {
        if let Err(e) = load_directory(&mut registry, dir, &mut report) {
            tracing::warn!("Skipping grammar directory {}: {}", dir.display(), e);
            report.unreadable.push((dir.clone(), e.to_string()));
        }
    }

    tracing::info!(
        "Loaded {} grammars ({} rejected, {} unreadable)",
        registry.len(),
        report.rejected.len(),
        report.unreadable.len()
    );
    (registry, report)
}

/// Registers every `*.toml` descriptor in `dir`, in file name order.
pub fn load_directory(
    registry: &mut LanguageRegistry,
    dir: &Path,
    report: &mut LoadReport,
) -> CoreResult<()> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    files.sort();

    for path in files {
        let descriptor = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|source| GrammarDescriptor::from_toml(&source).map_err(|e| e.to_string()));

        match descriptor {
            Ok(descriptor) => report.record(registry.register(descriptor)),
            Err(reason) => {
                tracing::warn!("Cannot load grammar {}: {}", path.display(), reason);
                report.unreadable.push((path, reason));
            }
        }
    }
    Ok(())
}
