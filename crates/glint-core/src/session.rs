//! Editing sessions.
//!
//! ## Learning: Newtypes
//!
//! `SessionId` wraps a `Uuid`, so a session id can never be confused with
//! any other id or string in an API signature.
//!
//! ## Shared Text
//!
//! The editing surface owns the buffer; a session only keeps the latest
//! snapshot it was handed. The snapshot lives behind a [`SharedText`]
//! handle so a deferred pass can read whatever is current when it finally
//! runs instead of what was current when it was requested.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use glint_syntax::{HighlightedSpan, TaggedSpan};

use crate::scheduler::TextSnapshot;
use crate::{CoreError, CoreResult};

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cloneable handle to the latest text of a session.
#[derive(Debug, Clone)]
pub struct SharedText(Arc<RwLock<TextSnapshot>>);

impl SharedText {
    pub fn new(text: impl Into<TextSnapshot>) -> Self {
        Self(Arc::new(RwLock::new(text.into())))
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> TextSnapshot {
        match self.0.read() {
            Ok(text) => text.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replaces the text.
    pub fn replace(&self, text: impl Into<TextSnapshot>) {
        let text = text.into();
        match self.0.write() {
            Ok(mut current) => *current = text,
            Err(poisoned) => *poisoned.into_inner() = text,
        }
    }
}

/// Result of the last completed highlight pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    /// The text the spans were computed from
    pub source: Option<TextSnapshot>,
    pub spans: Vec<HighlightedSpan>,
}

/// One buffer being edited.
#[derive(Debug)]
pub struct Session {
    id: SessionId,

    /// Language id or file extension
    language: String,

    text: SharedText,

    /// Bumped on every text change
    revision: u64,

    overlay: Overlay,

    brace: Vec<TaggedSpan>,
}

impl Session {
    pub fn new(language: impl Into<String>, text: impl Into<TextSnapshot>) -> Self {
        Self {
            id: SessionId::new(),
            language: language.into(),
            text: SharedText::new(text),
            revision: 0,
            overlay: Overlay::default(),
            brace: Vec::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    pub fn text(&self) -> TextSnapshot {
        self.text.snapshot()
    }

    /// Returns a handle that always reads the latest text.
    pub fn shared_text(&self) -> SharedText {
        self.text.clone()
    }

    /// Replaces the text; the brace overlay no longer applies.
    pub fn set_text(&mut self, text: impl Into<TextSnapshot>) {
        self.text.replace(text);
        self.revision += 1;
        self.brace.clear();
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Replaces the highlight overlay wholesale.
    pub fn set_overlay(&mut self, overlay: Overlay) {
        self.overlay = overlay;
    }

    pub fn brace_overlay(&self) -> &[TaggedSpan] {
        &self.brace
    }

    pub fn set_brace_overlay(&mut self, spans: Vec<TaggedSpan>) {
        self.brace = spans;
    }
}

/// All open sessions.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<SessionId, Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session and returns its id.
    pub fn insert(&mut self, session: Session) -> SessionId {
        let id = session.id();
        self.sessions.insert(id, session);
        id
    }

    pub fn remove(&mut self, id: SessionId) -> CoreResult<Session> {
        self.sessions
            .remove(&id)
            .ok_or(CoreError::SessionNotFound(id))
    }

    pub fn get(&self, id: SessionId) -> CoreResult<&Session> {
        self.sessions.get(&id).ok_or(CoreError::SessionNotFound(id))
    }

    pub fn get_mut(&mut self, id: SessionId) -> CoreResult<&mut Session> {
        self.sessions
            .get_mut(&id)
            .ok_or(CoreError::SessionNotFound(id))
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.sessions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
