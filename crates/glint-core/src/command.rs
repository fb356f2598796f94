//! Explicit command dispatch.
//!
//! ## Learning: The Command Pattern
//!
//! An editing surface never calls into the engine from widget callbacks.
//! It turns user actions into `Command` values and hands them to
//! [`Workbench::dispatch`](crate::Workbench::dispatch). Commands are plain
//! data: they can be queued, logged or replayed in a test.

use serde::Serialize;
use std::time::Duration;

use glint_syntax::{MatchResult, Symbol};

use crate::session::SessionId;

/// Everything an editing surface can ask of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Command {
    // Session lifecycle
    OpenSession { language: String, text: String },
    CloseSession { session: SessionId },
    SetText { session: SessionId, text: String },

    // Highlighting
    RequestHighlight { session: SessionId },
    FireDue,

    // Navigation
    MatchBrace { session: SessionId, cursor: usize },
    ExtractSymbols { session: SessionId },
    AutoindentHint { session: SessionId, preceding_line: String },

    // Grammars
    ReloadGrammars,
}

impl Command {
    /// Returns the command's display name.
    pub fn display_name(&self) -> &str {
        match self {
            Command::OpenSession { .. } => "Open Session",
            Command::CloseSession { .. } => "Close Session",
            Command::SetText { .. } => "Set Text",
            Command::RequestHighlight { .. } => "Request Highlight",
            Command::FireDue => "Fire Due Passes",
            Command::MatchBrace { .. } => "Match Brace",
            Command::ExtractSymbols { .. } => "Extract Symbols",
            Command::AutoindentHint { .. } => "Autoindent Hint",
            Command::ReloadGrammars => "Reload Grammars",
        }
    }
}

/// Result of a dispatched command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutput {
    /// Nothing to report
    Done,
    Opened { session: SessionId },
    /// A pass ran and produced this many spans
    Highlighted { spans: usize },
    Deferred { delay_ms: u64 },
    Coalesced,
    /// Sessions whose deferred pass ran
    Fired { sessions: Vec<SessionId> },
    Brace { result: MatchResult },
    Symbols { symbols: Vec<Symbol> },
    Indent { indent: bool },
    Reloaded { registered: usize, rejected: usize },
}

impl CommandOutput {
    pub(crate) fn deferred(delay: Duration) -> Self {
        CommandOutput::Deferred {
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Renders the output as JSON for a front end.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
