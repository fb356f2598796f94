//! The workbench ties sessions, the scheduler and the engine together.
//!
//! ## Learning: Explicit Context Instead of Globals
//!
//! There is no "current document". Every call names the session it acts
//! on, and the workbench is an ordinary value the caller owns:
//!
//! ```rust,ignore
//! let mut bench = Workbench::new(Config::default());
//! let id = bench.open_session("python", "def f(x):\n    pass\n");
//! bench.request_highlight(id)?;
//! bench.set_text(id, "def g(y):\n    pass\n")?;
//! bench.request_highlight(id)?;   // throttled: deferred
//! bench.run_deferred().await;     // runs once, on the latest text
//! ```

use std::sync::Arc;
use std::time::Instant;

use glint_syntax::{Engine, HighlightOptions, MatchResult, Symbol};

use crate::command::{Command, CommandOutput};
use crate::config::Config;
use crate::event::{EngineEvent, EventBus};
use crate::loader::{build_registry, LoadReport};
use crate::scheduler::{Clock, Dispatch, Scheduler, SnapshotProducer, SystemClock, TextSnapshot};
use crate::session::{Overlay, Session, SessionId, SessionManager};
use crate::CoreResult;

/// Sessions plus the shared engine they are analyzed with.
pub struct Workbench<C: Clock = SystemClock> {
    config: Config,
    engine: Engine,
    sessions: SessionManager,
    scheduler: Scheduler<C>,
    events: EventBus,
}

impl Workbench<SystemClock> {
    /// Creates a workbench, loading grammars as configured.
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Workbench<C> {
    pub fn with_clock(config: Config, clock: C) -> Self {
        let (registry, report) = build_registry(&config.grammars);
        let events = EventBus::new();
        emit_rejections(&events, &report);

        Self {
            engine: Engine::new(Arc::new(registry)).with_options(config.highlight.options()),
            sessions: SessionManager::new(),
            scheduler: Scheduler::with_clock(clock, config.scheduler.min_interval()),
            events,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn scheduler(&self) -> &Scheduler<C> {
        &self.scheduler
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn session(&self, id: SessionId) -> CoreResult<&Session> {
        self.sessions.get(id)
    }

    // ==================== Sessions ====================

    /// Opens a session; `language` is a language id or file extension.
    pub fn open_session(&mut self, language: &str, text: impl Into<TextSnapshot>) -> SessionId {
        let id = self.sessions.insert(Session::new(language, text));
        tracing::debug!("Opened session {} ({})", id, language);
        self.events.emit(EngineEvent::SessionOpened(id));
        id
    }

    /// Closes a session, discarding its pending pass.
    pub fn close_session(&mut self, id: SessionId) -> CoreResult<()> {
        self.sessions.remove(id)?;
        self.scheduler.forget(id);
        self.events.emit(EngineEvent::SessionClosed(id));
        Ok(())
    }

    /// Replaces a session's text. Does not highlight by itself.
    pub fn set_text(&mut self, id: SessionId, text: impl Into<TextSnapshot>) -> CoreResult<()> {
        self.sessions.get_mut(id)?.set_text(text);
        Ok(())
    }

    // ==================== Highlighting ====================

    /// Requests a highlight pass, throttled per session.
    pub fn request_highlight(&mut self, id: SessionId) -> CoreResult<Dispatch<usize>> {
        let session = self.sessions.get(id)?;
        let language = session.language().to_string();
        let text = session.shared_text();
        let producer: SnapshotProducer = Box::new(move || text.snapshot());

        let runner = PassRunner {
            engine: &self.engine,
            enabled: self.config.highlight.enabled,
        };
        let dispatch = self
            .scheduler
            .request(id, producer, |snapshot| runner.run(&language, snapshot));

        Ok(match dispatch {
            Dispatch::Ran(pass) => Dispatch::Ran(self.finish_pass(id, pass)),
            Dispatch::Deferred { delay } => {
                self.events.emit(EngineEvent::PassDeferred { session: id, delay });
                Dispatch::Deferred { delay }
            }
            Dispatch::Coalesced => Dispatch::Coalesced,
        })
    }

    /// Runs every deferred pass whose deadline has passed.
    ///
    /// Returns the sessions that were highlighted.
    pub fn fire_due(&mut self) -> Vec<SessionId> {
        let runner = PassRunner {
            engine: &self.engine,
            enabled: self.config.highlight.enabled,
        };
        let sessions = &self.sessions;
        let outputs = self.scheduler.fire_due(|id, snapshot| {
            let language = sessions
                .get(id)
                .map(|s| s.language().to_string())
                .unwrap_or_default();
            runner.run(&language, snapshot)
        });

        outputs
            .into_iter()
            .map(|(id, pass)| {
                self.finish_pass(id, pass);
                id
            })
            .collect()
    }

    /// Returns when the next deferred pass is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Sleeps until the next deferred pass is due, then fires it.
    ///
    /// Returns immediately with nothing when no timer is armed.
    pub async fn run_deferred(&mut self) -> Vec<SessionId> {
        let Some(deadline) = self.next_deadline() else {
            return Vec::new();
        };
        tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
        self.fire_due()
    }

    fn finish_pass(&mut self, id: SessionId, pass: Pass) -> usize {
        let spans = pass.overlay.spans.len();
        if let Ok(session) = self.sessions.get_mut(id) {
            session.set_overlay(pass.overlay);
        }
        self.events.emit(EngineEvent::PassCompleted {
            session: id,
            spans,
            elapsed: pass.elapsed,
        });
        spans
    }

    // ==================== Navigation ====================

    /// Matches the brace next to `cursor` and stores the brace overlay.
    pub fn match_brace(&mut self, id: SessionId, cursor: usize) -> CoreResult<MatchResult> {
        let session = self.sessions.get_mut(id)?;
        let result = self
            .engine
            .match_brace(&session.text(), cursor, session.language());
        session.set_brace_overlay(result.spans());
        Ok(result)
    }

    pub fn symbols(&self, id: SessionId) -> CoreResult<Vec<Symbol>> {
        let session = self.sessions.get(id)?;
        Ok(self.engine.extract_symbols(&session.text(), session.language()))
    }

    pub fn autoindent_hint(&self, id: SessionId, preceding_line: &str) -> CoreResult<bool> {
        let session = self.sessions.get(id)?;
        Ok(self.engine.autoindent_hint(session.language(), preceding_line))
    }

    // ==================== Grammars ====================

    /// Rebuilds the registry from the configured sources.
    ///
    /// Sessions keep their overlays; the next pass uses the new grammars.
    pub fn reload_grammars(&mut self) -> LoadReport {
        let (registry, report) = build_registry(&self.config.grammars);
        emit_rejections(&self.events, &report);
        self.engine = Engine::new(Arc::new(registry)).with_options(self.highlight_options());
        report
    }

    fn highlight_options(&self) -> HighlightOptions {
        self.config.highlight.options()
    }

    // ==================== Dispatch ====================

    /// Executes a command.
    pub fn dispatch(&mut self, command: Command) -> CoreResult<CommandOutput> {
        tracing::trace!("Dispatching {}", command.display_name());

        Ok(match command {
            Command::OpenSession { language, text } => CommandOutput::Opened {
                session: self.open_session(&language, text),
            },
            Command::CloseSession { session } => {
                self.close_session(session)?;
                CommandOutput::Done
            }
            Command::SetText { session, text } => {
                self.set_text(session, text)?;
                CommandOutput::Done
            }
            Command::RequestHighlight { session } => match self.request_highlight(session)? {
                Dispatch::Ran(spans) => CommandOutput::Highlighted { spans },
                Dispatch::Deferred { delay } => CommandOutput::deferred(delay),
                Dispatch::Coalesced => CommandOutput::Coalesced,
            },
            Command::FireDue => CommandOutput::Fired {
                sessions: self.fire_due(),
            },
            Command::MatchBrace { session, cursor } => CommandOutput::Brace {
                result: self.match_brace(session, cursor)?,
            },
            Command::ExtractSymbols { session } => CommandOutput::Symbols {
                symbols: self.symbols(session)?,
            },
            Command::AutoindentHint {
                session,
                preceding_line,
            } => CommandOutput::Indent {
                indent: self.autoindent_hint(session, &preceding_line)?,
            },
            Command::ReloadGrammars => {
                let report = self.reload_grammars();
                CommandOutput::Reloaded {
                    registered: report.registered.len(),
                    rejected: report.rejected.len(),
                }
            }
        })
    }
}

/// Output of one pass before it is stored on the session.
struct Pass {
    overlay: Overlay,
    elapsed: std::time::Duration,
}

/// Borrowed view of what a pass needs, so the scheduler can be borrowed
/// mutably at the same time.
struct PassRunner<'a> {
    engine: &'a Engine,
    enabled: bool,
}

impl PassRunner<'_> {
    fn run(&self, language: &str, snapshot: TextSnapshot) -> Pass {
        let started = Instant::now();
        let spans = if self.enabled {
            self.engine.highlight(&snapshot, language)
        } else {
            Vec::new()
        };
        Pass {
            overlay: Overlay {
                source: Some(snapshot),
                spans,
            },
            elapsed: started.elapsed(),
        }
    }
}

fn emit_rejections(events: &EventBus, report: &LoadReport) {
    for warning in &report.rejected {
        events.emit(EngineEvent::GrammarRejected {
            language: warning.language.clone(),
            reason: warning.defect.to_string(),
        });
    }
}
