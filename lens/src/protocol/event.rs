//! Notifications a backend sends back to the browser.

use std::collections::BTreeSet;
use std::sync::mpsc::{self, Receiver, Sender};

use super::ModelCapabilities;
use crate::schema::{Record, SessionId};

/// One backend callback. Session scoped events carry the id of the session
/// they answer.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// The backend finished [`initialize`](super::Backend::initialize).
    InitializationDone,

    AvailableContentTypesChanged(Vec<String>),

    /// `session: None` applies to every session.
    CapabilitiesChanged {
        session: Option<SessionId>,
        capabilities: ModelCapabilities,
    },

    /// Acknowledges `set_content_type`.
    ContentTypeChanged {
        session: SessionId,
        content_type: String,
    },

    /// Property names usable in queries for the current content type.
    QueryIdentifiersChanged {
        session: SessionId,
        identifiers: BTreeSet<String>,
    },

    /// Answer to `fetch_data`.
    DataFetched {
        session: SessionId,
        records: Vec<Record>,
        start: usize,
        more_available: bool,
    },

    /// Total row count; precedes `DataFetched` when the count is known.
    CountChanged { session: SessionId, count: usize },

    /// Replace `count` rows at `start` with `records`.
    DataChanged {
        session: SessionId,
        records: Vec<Record>,
        start: usize,
        count: usize,
    },

    /// Drill-down availability for rows `start..start + flags.len()`.
    CanGoForwardChanged {
        session: SessionId,
        flags: Vec<bool>,
        start: usize,
    },

    CanGoBackChanged { session: SessionId, allowed: bool },
}

impl BackendEvent {
    /// The session this event is addressed to, if any.
    pub fn session(&self) -> Option<SessionId> {
        match self {
            BackendEvent::InitializationDone | BackendEvent::AvailableContentTypesChanged(_) => None,
            BackendEvent::CapabilitiesChanged { session, .. } => *session,
            BackendEvent::ContentTypeChanged { session, .. }
            | BackendEvent::QueryIdentifiersChanged { session, .. }
            | BackendEvent::DataFetched { session, .. }
            | BackendEvent::CountChanged { session, .. }
            | BackendEvent::DataChanged { session, .. }
            | BackendEvent::CanGoForwardChanged { session, .. }
            | BackendEvent::CanGoBackChanged { session, .. } => Some(*session),
        }
    }

    /// Events that describe window contents of the current content type.
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            BackendEvent::DataFetched { .. }
                | BackendEvent::CountChanged { .. }
                | BackendEvent::DataChanged { .. }
                | BackendEvent::CanGoForwardChanged { .. }
        )
    }
}

/// Sending half of the event channel handed to a backend.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<BackendEvent>,
}

impl EventSink {
    /// Queue an event. Returns false once the browser has gone away.
    pub fn emit(&self, event: BackendEvent) -> bool {
        if self.tx.send(event).is_err() {
            tracing::debug!("browser disconnected, dropping backend event");
            return false;
        }
        true
    }
}

/// Create a connected sink and receiver.
pub fn channel() -> (EventSink, Receiver<BackendEvent>) {
    let (tx, rx) = mpsc::channel();
    (EventSink { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let (sink, rx) = channel();
        let session = SessionId::new();
        sink.emit(BackendEvent::CountChanged { session, count: 3 });
        sink.emit(BackendEvent::CanGoBackChanged {
            session,
            allowed: true,
        });

        let events: Vec<BackendEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], BackendEvent::CountChanged { count: 3, .. }));
        assert_eq!(events[1].session(), Some(session));
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (sink, rx) = channel();
        drop(rx);
        assert!(!sink.emit(BackendEvent::InitializationDone));
    }

    #[test]
    fn test_data_events() {
        let session = SessionId::new();
        assert!(BackendEvent::CountChanged { session, count: 1 }.is_data());
        assert!(!BackendEvent::CanGoBackChanged {
            session,
            allowed: false
        }
        .is_data());
    }
}
