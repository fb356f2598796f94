//! # Glint Core
//!
//! Everything around the highlighting engine that an editing surface
//! talks to: sessions, the incremental scheduler, configuration, grammar
//! loading, events and command dispatch.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Workbench                          │
//! │  ┌──────────┐ ┌───────────┐ ┌──────────┐ ┌─────────────┐ │
//! │  │  Config  │ │ Scheduler │ │ EventBus │ │  Commands   │ │
//! │  └──────────┘ └───────────┘ └──────────┘ └─────────────┘ │
//! │        │                                                  │
//! │  ┌─────┴──────────────────────┐   ┌────────────────────┐ │
//! │  │       Session Manager      │   │  Engine (shared    │ │
//! │  │  ┌─────────┐ ┌─────────┐   │──▶│  LanguageRegistry) │ │
//! │  │  │ Session │ │ Session │   │   └────────────────────┘ │
//! │  │  └─────────┘ └─────────┘   │                          │
//! │  └────────────────────────────┘                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Learning: Single-Threaded by Design
//!
//! A pass runs synchronously inside the call that triggers it. The only
//! asynchronous piece is the deferred timer, awaited with
//! [`Workbench::run_deferred`] on the caller's own task.

pub mod command;
pub mod config;
pub mod event;
pub mod loader;
pub mod scheduler;
pub mod session;
pub mod workbench;

pub use command::{Command, CommandOutput};
pub use config::{Config, ConfigError};
pub use event::{EngineEvent, EventBus, EventHandler};
pub use loader::{build_registry, LoadReport};
pub use scheduler::{Clock, Dispatch, ManualClock, Scheduler, SystemClock, TextSnapshot};
pub use session::{Session, SessionId};
pub use workbench::Workbench;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Syntax error: {0}")]
    Syntax(#[from] glint_syntax::SyntaxError),
}
