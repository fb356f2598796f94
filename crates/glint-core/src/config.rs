//! Engine configuration.
//!
//! ## Learning: Serde Defaults
//!
//! Every section is `#[serde(default)]`, so a config file only needs the
//! keys it changes:
//!
//! ```toml
//! [scheduler]
//! min_interval_ms = 50
//! ```
//!
//! A missing file is not an error either; it simply means defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use glint_syntax::HighlightOptions;

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Highlight pass settings
    pub highlight: HighlightConfig,

    /// Pass throttling
    pub scheduler: SchedulerConfig,

    /// Where grammars come from
    pub grammars: GrammarConfig,
}

impl Config {
    /// Loads config from the default location, falling back to defaults.
    pub fn load() -> Self {
        match Self::load_from_default_path() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("glint").join("config.toml"))
    }

    /// Writes the config as TOML.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path.as_ref(), toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Highlight pass configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// When false every pass yields an empty overlay
    pub enabled: bool,

    /// Column after which a line is tagged `too_long`
    pub overlong_line_limit: usize,

    pub mark_overlong_lines: bool,
}

impl HighlightConfig {
    pub fn options(&self) -> HighlightOptions {
        HighlightOptions {
            overlong_line_limit: self.overlong_line_limit,
            mark_overlong_lines: self.mark_overlong_lines,
        }
    }
}

impl Default for HighlightConfig {
    fn default() -> Self {
        let options = HighlightOptions::default();
        Self {
            enabled: true,
            overlong_line_limit: options.overlong_line_limit,
            mark_overlong_lines: options.mark_overlong_lines,
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Floor of the adaptive threshold between two passes
    pub min_interval_ms: u64,
}

impl SchedulerConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { min_interval_ms: 20 }
    }
}

/// Grammar sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    /// Register the grammars compiled into the binary
    pub load_builtin: bool,

    /// Directories of `*.toml` descriptors, loaded after the builtins
    pub directories: Vec<PathBuf>,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            load_builtin: true,
            directories: Vec::new(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
