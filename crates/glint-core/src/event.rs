//! Engine notifications.
//!
//! ## Learning: Observer Pattern in Rust
//!
//! Instead of registering callbacks, observers subscribe to a
//! `tokio::sync::broadcast` channel and receive cloned event values. The
//! engine never holds a reference to whoever is listening.

use std::time::Duration;
use tokio::sync::broadcast;

use crate::session::SessionId;

/// Events emitted by the workbench.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A session was opened
    SessionOpened(SessionId),
    /// A session was closed
    SessionClosed(SessionId),

    /// A highlight pass replaced a session's overlay
    PassCompleted {
        session: SessionId,
        spans: usize,
        elapsed: Duration,
    },
    /// A request was throttled; the pass will run after `delay`
    PassDeferred { session: SessionId, delay: Duration },

    /// A grammar descriptor could not be registered
    GrammarRejected { language: Option<String>, reason: String },
}

/// Broadcasts engine events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Emits an event; having no subscribers is fine.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Async helper that skips over lag instead of failing.
pub struct EventHandler {
    receiver: broadcast::Receiver<EngineEvent>,
}

impl EventHandler {
    pub fn new(receiver: broadcast::Receiver<EngineEvent>) -> Self {
        Self { receiver }
    }

    /// Waits for the next event; `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<EngineEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event handler lagged, missed {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns an already queued event without waiting.
    pub fn try_next(&mut self) -> Option<EngineEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!("Event handler lagged, missed {} events", n);
                }
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let id = SessionId::new();

        bus.emit(EngineEvent::SessionOpened(id));

        assert_eq!(rx.recv().await.unwrap(), EngineEvent::SessionOpened(id));
    }

    #[tokio::test]
    async fn test_handler_ends_when_bus_dropped() {
        let bus = EventBus::new();
        let mut handler = EventHandler::new(bus.subscribe());
        bus.emit(EngineEvent::SessionClosed(SessionId::new()));
        drop(bus);

        assert!(matches!(handler.next().await, Some(EngineEvent::SessionClosed(_))));
        assert!(handler.next().await.is_none());
    }

    #[test]
    fn test_try_next() {
        let bus = EventBus::new();
        let mut handler = EventHandler::new(bus.subscribe());
        assert!(handler.try_next().is_none());

        bus.emit(EngineEvent::GrammarRejected {
            language: None,
            reason: "missing language".to_string(),
        });
        assert!(handler.try_next().is_some());
    }
}
