//! The browse engine: sessions, paging and navigation against one backend.

use std::collections::HashMap;
use std::sync::mpsc::Receiver;

use tracing::{debug, warn};

use super::session::{chunk_key, LoadingType, NavigationType, Session, SessionState};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::protocol::{
    channel, Backend, BackendEvent, ModelCapabilities, PendingReply, ReplyState,
};
use crate::query::{ConjunctionKind, ParsedQuery, QueryParser};
use crate::schema::{Record, SessionId};

/// Something a client watching a session may need to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    InitializationDone,
    AvailableContentTypesChanged,
    CapabilitiesChanged { session: SessionId },
    ContentTypeChanged { session: SessionId, content_type: String },
    QueryIdentifiersChanged { session: SessionId },
    /// The window was cleared.
    ModelReset { session: SessionId },
    RowsInserted { session: SessionId, start: usize, count: usize },
    RowsRemoved { session: SessionId, start: usize, count: usize },
    RowsChanged { session: SessionId, start: usize, count: usize },
    CanGoForwardChanged { session: SessionId, start: usize, count: usize },
    CanGoBackChanged { session: SessionId, allowed: bool },
    /// A read came within the fetch threshold of the end of the window.
    FetchMoreThresholdReached { session: SessionId },
    /// Out-of-model navigation opened `session` from `parent`.
    SessionOpened { session: SessionId, parent: SessionId },
    NavigationFailed { session: SessionId },
}

/// Result of [`Browser::read`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Read<'a> {
    Ready(&'a Record),
    /// The row exists but its data has not arrived yet.
    Pending,
    OutOfRange,
}

impl<'a> Read<'a> {
    pub fn record(self) -> Option<&'a Record> {
        match self {
            Read::Ready(record) => Some(record),
            _ => None,
        }
    }
}

/// Outcome of [`Browser::go_forward`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigated {
    InModel,
    /// Children are shown in this newly opened session.
    OutOfModel(SessionId),
}

enum RowChange {
    Changed,
    Removed,
    Inserted,
}

/// A navigation whose content type the backend has yet to resolve.
struct PendingNavigation {
    /// Session that switches to the resolved content type.
    session: SessionId,
    reply: PendingReply<String>,
}

/// Drives browse sessions against a backend.
///
/// Single threaded: backend answers queue up in a channel and are applied by
/// [`process_events`](Self::process_events), one call per event-loop turn.
pub struct Browser {
    config: Config,
    backend: Option<Box<dyn Backend>>,
    events: Option<Receiver<BackendEvent>>,
    sessions: HashMap<SessionId, Session>,
    capabilities: ModelCapabilities,
    available_content_types: Vec<String>,
    initialized: bool,
    navigations: Vec<PendingNavigation>,
    notifications: Vec<Notification>,
}

fn require_backend<'a>(
    backend: &'a mut Option<Box<dyn Backend>>,
    action: &str,
) -> Result<&'a mut Box<dyn Backend>> {
    backend.as_mut().ok_or_else(|| {
        warn!("cannot {}: no backend connected", action);
        Error::Connection(format!("cannot {}: no backend connected", action))
    })
}

fn capability_error(session: SessionId, message: &str) -> Error {
    warn!(%session, "{}", message);
    Error::Capability(message.to_string())
}

/// Check that the backend can evaluate `query`.
fn check_query_support(
    session: SessionId,
    caps: ModelCapabilities,
    query: &ParsedQuery,
) -> Result<()> {
    if let Some(filter) = &query.filter {
        if !caps.contains(ModelCapabilities::SUPPORTS_FILTERING) {
            return Err(capability_error(session, "backend does not support filtering"));
        }
        if filter.uses_conjunction(ConjunctionKind::And)
            && !caps.contains(ModelCapabilities::SUPPORTS_AND_CONJUNCTION)
        {
            return Err(capability_error(session, "backend does not support AND conjunctions"));
        }
        if filter.uses_conjunction(ConjunctionKind::Or)
            && !caps.contains(ModelCapabilities::SUPPORTS_OR_CONJUNCTION)
        {
            return Err(capability_error(session, "backend does not support OR conjunctions"));
        }
    }
    if !query.order.is_empty() && !caps.contains(ModelCapabilities::SUPPORTS_SORTING) {
        return Err(capability_error(session, "backend does not support sorting"));
    }
    Ok(())
}

/// Request the next chunk in fetch-more mode. At most one request is
/// outstanding per session.
fn request_more(backend: &mut dyn Backend, session: &mut Session) -> bool {
    if session.loading_type != LoadingType::FetchMore
        || !session.more_available
        || session.state != SessionState::Idle
    {
        return false;
    }
    session.state = SessionState::Fetching;
    session.fetch_start = session.fetched_count;
    debug!(
        session = %session.id,
        start = session.fetched_count,
        count = session.chunk_size,
        "fetching more rows"
    );
    backend.fetch_data(session.id, session.fetched_count, session.chunk_size);
    true
}

/// Request one chunk in count-known mode, once.
fn request_chunk(backend: &mut dyn Backend, session: &mut Session, chunk: usize) -> bool {
    if !session.requested_chunks.insert(chunk_key(chunk)) {
        return false;
    }
    let start = chunk * session.chunk_size;
    debug!(session = %session.id, chunk, start, "fetching chunk");
    backend.fetch_data(session.id, start, session.chunk_size);
    true
}

impl Default for Browser {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Browser {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            backend: None,
            events: None,
            sessions: HashMap::new(),
            capabilities: ModelCapabilities::NO_EXTRAS,
            available_content_types: Vec::new(),
            initialized: false,
            navigations: Vec::new(),
            notifications: Vec::new(),
        }
    }

    pub fn with_backend(config: Config, backend: Box<dyn Backend>) -> Self {
        let mut browser = Self::new(config);
        browser.connect(backend);
        browser
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // Connection

    /// Attach a backend, replacing any previous one. Existing sessions are
    /// registered and reload their requested content type.
    pub fn connect(&mut self, mut backend: Box<dyn Backend>) {
        if self.backend.is_some() {
            self.disconnect();
        }

        let (sink, rx) = channel();
        backend.initialize(sink);

        let mut ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        ids.sort();
        for id in &ids {
            backend.register_instance(*id);
            if let Some(session) = self.sessions.get(id) {
                if session.filter.is_some() || !session.order.is_empty() {
                    backend.setup_filter(*id, session.filter.as_ref(), &session.order);
                }
            }
        }

        self.backend = Some(backend);
        self.events = Some(rx);

        for id in ids {
            self.begin_reset(id);
        }
    }

    /// Detach the backend. Sessions stay open with empty windows.
    pub fn disconnect(&mut self) {
        let Some(mut backend) = self.backend.take() else {
            return;
        };

        let mut ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        ids.sort();
        for id in &ids {
            backend.unregister_instance(*id);
        }

        self.events = None;
        self.navigations.clear();
        self.capabilities = ModelCapabilities::NO_EXTRAS;
        self.available_content_types.clear();
        self.initialized = false;

        for id in ids {
            if let Some(session) = self.sessions.get_mut(&id) {
                session.reset_window();
                session.content_type.clear();
                session.capabilities = ModelCapabilities::NO_EXTRAS;
                session.state = SessionState::Idle;
                self.notifications.push(Notification::ModelReset { session: id });
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.backend.is_some()
    }

    /// True once the backend reported `InitializationDone`.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Capabilities the backend advertised for all sessions.
    pub fn capabilities(&self) -> ModelCapabilities {
        self.capabilities
    }

    pub fn available_content_types(&self) -> &[String] {
        &self.available_content_types
    }

    // Sessions

    pub fn open_session(&mut self) -> SessionId {
        let id = SessionId::new();
        let mut session = Session::new(id, &self.config);
        session.capabilities = self.capabilities;
        if let Some(backend) = self.backend.as_mut() {
            backend.register_instance(id);
        }
        self.sessions.insert(id, session);
        debug!(session = %id, "opened session");
        id
    }

    pub fn close_session(&mut self, id: SessionId) -> Result<()> {
        self.sessions
            .remove(&id)
            .ok_or(Error::UnknownSession(id))?;
        if let Some(backend) = self.backend.as_mut() {
            backend.unregister_instance(id);
        }
        self.navigations.retain(|nav| nav.session != id);
        debug!(session = %id, "closed session");
        Ok(())
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Open sessions, oldest first.
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn row_count(&self, id: SessionId) -> usize {
        self.sessions.get(&id).map_or(0, Session::row_count)
    }

    pub fn can_go_forward(&self, id: SessionId, index: usize) -> bool {
        self.sessions
            .get(&id)
            .is_some_and(|s| s.can_go_forward(index))
    }

    pub fn can_go_back(&self, id: SessionId) -> bool {
        self.sessions.get(&id).is_some_and(Session::can_go_back)
    }

    /// Drain notifications produced since the last call.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // Query and content type

    /// Filter and sort the session with a query string.
    ///
    /// An empty string clears the filter. On a syntax or capability error
    /// the session is left unchanged. On success the backend receives the
    /// new filter and the session reloads.
    pub fn set_query(&mut self, id: SessionId, query: &str) -> Result<()> {
        let backend = require_backend(&mut self.backend, "set the query")?;
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(Error::UnknownSession(id))?;
        if session.query == query {
            return Ok(());
        }

        let parsed = if query.trim().is_empty() {
            ParsedQuery::default()
        } else {
            let caps = session.capabilities;
            if !caps.contains(ModelCapabilities::SUPPORTS_FILTERING)
                && !caps.contains(ModelCapabilities::SUPPORTS_SORTING)
            {
                return Err(capability_error(
                    id,
                    "backend supports neither filtering nor sorting",
                ));
            }

            let parser = QueryParser::new()
                .with_allowed_identifiers(session.query_identifiers.iter().cloned());
            let parsed = parser.parse(query).map_err(|e| {
                warn!(session = %id, "invalid query:\n{}", e);
                e
            })?;
            check_query_support(id, caps, &parsed)?;
            parsed
        };

        session.query = query.to_string();
        session.filter = parsed.filter;
        session.order = parsed.order;
        backend.setup_filter(id, session.filter.as_ref(), &session.order);
        debug!(session = %id, query, "query changed");

        self.begin_reset(id);
        Ok(())
    }

    /// Browse another content type. Clears the query; the window resets
    /// once the backend acknowledges the switch.
    pub fn set_content_type(&mut self, id: SessionId, content_type: &str) -> Result<()> {
        let backend = require_backend(&mut self.backend, "set the content type")?;
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(Error::UnknownSession(id))?;
        if session.content_type_requested == content_type {
            return Ok(());
        }

        session.content_type_requested = content_type.to_string();
        session.clear_query();
        backend.setup_filter(id, None, &[]);
        self.notifications
            .push(Notification::QueryIdentifiersChanged { session: id });
        self.notifications.push(Notification::CanGoBackChanged {
            session: id,
            allowed: false,
        });

        self.begin_reset(id);
        Ok(())
    }

    /// Re-request the current content type and refetch from the start.
    pub fn reload(&mut self, id: SessionId) -> Result<()> {
        require_backend(&mut self.backend, "reload")?;
        if !self.sessions.contains_key(&id) {
            return Err(Error::UnknownSession(id));
        }
        self.begin_reset(id);
        Ok(())
    }

    /// Start the content type round trip that ends in a window reset.
    fn begin_reset(&mut self, id: SessionId) {
        let (Some(session), Some(backend)) = (self.sessions.get_mut(&id), self.backend.as_mut())
        else {
            return;
        };

        if session.content_type_requested.is_empty() {
            session.content_type.clear();
            session.reset_window();
            session.state = SessionState::Idle;
            self.notifications.push(Notification::ModelReset { session: id });
            return;
        }

        session.state = SessionState::SwitchingContentType;
        debug!(session = %id, content_type = %session.content_type_requested, "switching content type");
        backend.set_content_type(id, &session.content_type_requested);
    }

    // Paging settings

    pub fn set_chunk_size(&mut self, id: SessionId, chunk_size: usize) -> Result<()> {
        if chunk_size == 0 {
            return Err(Error::InvalidArgument(
                "chunk size must be greater than 0".to_string(),
            ));
        }
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(Error::UnknownSession(id))?;
        if session.chunk_size == chunk_size {
            return Ok(());
        }
        session.chunk_size = chunk_size;

        // Chunk bookkeeping is indexed by chunk size.
        if session.loading_type == LoadingType::CountKnown {
            session.reset_window();
            self.begin_reset(id);
        }
        Ok(())
    }

    pub fn set_fetch_threshold(&mut self, id: SessionId, fetch_threshold: usize) -> Result<()> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(Error::UnknownSession(id))?;
        session.fetch_threshold = fetch_threshold;
        Ok(())
    }

    /// Switch between fetch-more and count-known loading; reloads the
    /// session. Count-known loading needs `SUPPORTS_GET_SIZE`.
    pub fn set_loading_type(&mut self, id: SessionId, loading_type: LoadingType) -> Result<()> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(Error::UnknownSession(id))?;
        if session.loading_type == loading_type {
            return Ok(());
        }
        if loading_type == LoadingType::CountKnown
            && !session
                .capabilities
                .contains(ModelCapabilities::SUPPORTS_GET_SIZE)
        {
            return Err(capability_error(
                id,
                "count-known loading needs a backend that reports the row count",
            ));
        }

        session.loading_type = loading_type;
        session.reset_window();
        self.notifications.push(Notification::ModelReset { session: id });
        self.begin_reset(id);
        Ok(())
    }

    // Reading

    /// Read a row, prefetching as a side effect.
    ///
    /// In fetch-more mode a read within `fetch_threshold` rows of the end
    /// requests the next chunk. In count-known mode reading a placeholder
    /// requests its chunk and returns [`Read::Pending`].
    pub fn read(&mut self, id: SessionId, index: usize) -> Result<Read<'_>> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(Error::UnknownSession(id))?;
        if index >= session.window.len() {
            return Ok(Read::OutOfRange);
        }

        match session.loading_type {
            LoadingType::FetchMore => {
                let near_end =
                    index >= session.fetched_count.saturating_sub(session.fetch_threshold);
                if near_end && session.more_available && session.state == SessionState::Idle {
                    self.notifications
                        .push(Notification::FetchMoreThresholdReached { session: id });
                    if let Some(backend) = self.backend.as_mut() {
                        request_more(&mut **backend, session);
                    }
                }
            }
            LoadingType::CountKnown => {
                if session.window.is_placeholder(index)
                    && session.state != SessionState::SwitchingContentType
                {
                    let chunk = session.chunk_of(index);
                    if let Some(backend) = self.backend.as_mut() {
                        request_chunk(&mut **backend, session, chunk);
                    }
                }
            }
        }

        Ok(self
            .sessions
            .get(&id)
            .and_then(|s| s.window.get(index))
            .map_or(Read::Pending, Read::Ready))
    }

    /// Explicitly request the next chunk in fetch-more mode. Returns false
    /// if nothing was requested.
    pub fn fetch_more(&mut self, id: SessionId) -> Result<bool> {
        let backend = require_backend(&mut self.backend, "fetch more rows")?;
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(Error::UnknownSession(id))?;
        Ok(request_more(&mut **backend, session))
    }

    // Navigation

    /// Drill down into row `index`.
    ///
    /// Fails without contacting the backend unless the backend flagged the
    /// row as navigable. The new content type is applied once the backend's
    /// reply resolves, to this session or to a new one for out-of-model
    /// navigation.
    pub fn go_forward(
        &mut self,
        id: SessionId,
        index: usize,
        navigation: NavigationType,
    ) -> Result<Navigated> {
        let backend = require_backend(&mut self.backend, "go forward")?;
        let session = self.sessions.get(&id).ok_or(Error::UnknownSession(id))?;

        if index >= session.row_count() {
            warn!(session = %id, index, "cannot go forward: index out of range");
            return Err(Error::InvalidArgument(format!(
                "index {} out of range",
                index
            )));
        }
        if !session.can_go_forward(index) {
            warn!(session = %id, index, "cannot go forward from this row");
            return Err(Error::InvalidArgument(format!(
                "cannot go forward from row {}",
                index
            )));
        }

        match navigation {
            NavigationType::InModel => {
                let reply = backend.go_forward(id, index);
                self.navigations.push(PendingNavigation { session: id, reply });
                Ok(Navigated::InModel)
            }
            NavigationType::OutOfModel => {
                let caps = self.capabilities | session.capabilities;
                if !caps.contains(ModelCapabilities::SUPPORTS_STATELESS_NAVIGATION) {
                    return Err(capability_error(
                        id,
                        "out-of-model navigation needs stateless navigation support",
                    ));
                }
                let (chunk_size, fetch_threshold, loading_type) = (
                    session.chunk_size,
                    session.fetch_threshold,
                    session.loading_type,
                );

                let reply = backend.go_forward(id, index);
                let child = self.open_session();
                if let Some(session) = self.sessions.get_mut(&child) {
                    session.chunk_size = chunk_size;
                    session.fetch_threshold = fetch_threshold;
                    session.loading_type = loading_type;
                }
                self.navigations.push(PendingNavigation {
                    session: child,
                    reply,
                });
                self.notifications.push(Notification::SessionOpened {
                    session: child,
                    parent: id,
                });
                Ok(Navigated::OutOfModel(child))
            }
        }
    }

    /// Return to the parent content type.
    pub fn go_back(&mut self, id: SessionId) -> Result<()> {
        let backend = require_backend(&mut self.backend, "go back")?;
        let session = self.sessions.get(&id).ok_or(Error::UnknownSession(id))?;
        if !session.back_allowed {
            warn!(session = %id, "cannot go back");
            return Err(Error::InvalidArgument("cannot go back".to_string()));
        }
        let reply = backend.go_back(id);
        self.navigations.push(PendingNavigation { session: id, reply });
        Ok(())
    }

    // Item operations

    /// Backend for an item operation, if connected and capable.
    fn item_backend(
        &mut self,
        id: SessionId,
        needed: ModelCapabilities,
        action: &str,
        rows: &[usize],
    ) -> Option<&mut Box<dyn Backend>> {
        let Some(session) = self.sessions.get(&id) else {
            warn!(session = %id, "cannot {}: unknown session", action);
            return None;
        };
        let caps = session.capabilities;
        let row_count = session.row_count();

        let Some(backend) = self.backend.as_mut() else {
            warn!(session = %id, "cannot {}: no backend connected", action);
            return None;
        };
        if !caps.contains(needed) {
            warn!(session = %id, "cannot {}: not supported by the backend", action);
            return None;
        }
        if let Some(row) = rows.iter().find(|row| **row >= row_count) {
            warn!(session = %id, row, "cannot {}: index out of range", action);
            return None;
        }
        Some(backend)
    }

    pub fn insert(&mut self, id: SessionId, index: usize, record: Record) -> PendingReply<()> {
        match self.item_backend(id, ModelCapabilities::SUPPORTS_INSERT, "insert", &[]) {
            Some(backend) => backend.insert(id, index, &record),
            None => PendingReply::failed(),
        }
    }

    pub fn remove(&mut self, id: SessionId, index: usize) -> PendingReply<()> {
        match self.item_backend(id, ModelCapabilities::SUPPORTS_REMOVE, "remove", &[index]) {
            Some(backend) => backend.remove(id, index),
            None => PendingReply::failed(),
        }
    }

    pub fn move_item(&mut self, id: SessionId, from: usize, to: usize) -> PendingReply<()> {
        match self.item_backend(id, ModelCapabilities::SUPPORTS_MOVE, "move", &[from, to]) {
            Some(backend) => backend.move_item(id, from, to),
            None => PendingReply::failed(),
        }
    }

    /// Ask the backend for the row index of `record`.
    pub fn index_of(&mut self, id: SessionId, record: &Record) -> PendingReply<usize> {
        match self.item_backend(id, ModelCapabilities::NO_EXTRAS, "look up an index", &[]) {
            Some(backend) => backend.index_of(id, record),
            None => PendingReply::failed(),
        }
    }

    // Event loop

    /// Apply queued backend events in arrival order and resolve finished
    /// navigations. Returns how many of them were handled.
    pub fn process_events(&mut self) -> usize {
        let events: Vec<BackendEvent> = match &self.events {
            Some(rx) => rx.try_iter().collect(),
            None => Vec::new(),
        };
        let handled = events.len();
        for event in events {
            self.handle_event(event);
        }
        handled + self.poll_navigations()
    }

    /// Call [`process_events`](Self::process_events) until nothing is left.
    pub fn process_until_idle(&mut self) -> usize {
        let mut total = 0;
        loop {
            let handled = self.process_events();
            if handled == 0 {
                return total;
            }
            total += handled;
        }
    }

    fn handle_event(&mut self, event: BackendEvent) {
        if let Some(id) = event.session() {
            let Some(session) = self.sessions.get(&id) else {
                debug!(session = %id, "dropping event for unknown session");
                return;
            };
            if event.is_data() && session.state == SessionState::SwitchingContentType {
                debug!(session = %id, "dropping data event of the previous content type");
                return;
            }
        }

        match event {
            BackendEvent::InitializationDone => {
                self.initialized = true;
                self.notifications.push(Notification::InitializationDone);
            }
            BackendEvent::AvailableContentTypesChanged(types) => {
                self.available_content_types = types;
                self.notifications
                    .push(Notification::AvailableContentTypesChanged);
            }
            BackendEvent::CapabilitiesChanged {
                session: None,
                capabilities,
            } => {
                self.capabilities = capabilities;
                let mut ids: Vec<SessionId> = self.sessions.keys().copied().collect();
                ids.sort();
                for id in ids {
                    if let Some(session) = self.sessions.get_mut(&id) {
                        session.capabilities = capabilities;
                    }
                    self.notifications
                        .push(Notification::CapabilitiesChanged { session: id });
                }
            }
            BackendEvent::CapabilitiesChanged {
                session: Some(id),
                capabilities,
            } => {
                if let Some(session) = self.sessions.get_mut(&id) {
                    session.capabilities = capabilities;
                    self.notifications
                        .push(Notification::CapabilitiesChanged { session: id });
                }
            }
            BackendEvent::ContentTypeChanged {
                session,
                content_type,
            } => self.on_content_type_changed(session, content_type),
            BackendEvent::QueryIdentifiersChanged {
                session,
                identifiers,
            } => {
                if let Some(s) = self.sessions.get_mut(&session) {
                    s.query_identifiers = identifiers;
                    self.notifications
                        .push(Notification::QueryIdentifiersChanged { session });
                }
            }
            BackendEvent::DataFetched {
                session,
                records,
                start,
                more_available,
            } => self.on_data_fetched(session, records, start, more_available),
            BackendEvent::CountChanged { session, count } => self.on_count_changed(session, count),
            BackendEvent::DataChanged {
                session,
                records,
                start,
                count,
            } => self.on_data_changed(session, records, start, count),
            BackendEvent::CanGoForwardChanged {
                session,
                flags,
                start,
            } => {
                if let Some(s) = self.sessions.get_mut(&session) {
                    if let Err(e) = s.set_forward_flags(start, &flags) {
                        warn!(%session, error = %e, "dropping forward flags");
                        return;
                    }
                    self.notifications.push(Notification::CanGoForwardChanged {
                        session,
                        start,
                        count: flags.len(),
                    });
                }
            }
            BackendEvent::CanGoBackChanged { session, allowed } => {
                if let Some(s) = self.sessions.get_mut(&session) {
                    s.back_allowed = allowed;
                    self.notifications
                        .push(Notification::CanGoBackChanged { session, allowed });
                }
            }
        }
    }

    fn on_content_type_changed(&mut self, id: SessionId, content_type: String) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        if content_type != session.content_type_requested {
            debug!(
                session = %id,
                %content_type,
                requested = %session.content_type_requested,
                "dropping stale content type acknowledgment"
            );
            return;
        }
        if session.state != SessionState::SwitchingContentType {
            debug!(session = %id, %content_type, "dropping unsolicited content type acknowledgment");
            return;
        }

        session.content_type = content_type.clone();
        session.state = SessionState::Idle;
        session.reset_window();
        session.more_available = true;
        self.notifications.push(Notification::ContentTypeChanged {
            session: id,
            content_type,
        });
        self.notifications.push(Notification::ModelReset { session: id });

        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        match session.loading_type {
            LoadingType::FetchMore => {
                request_more(&mut **backend, session);
            }
            LoadingType::CountKnown => {
                request_chunk(&mut **backend, session, 0);
            }
        }
    }

    fn on_data_fetched(
        &mut self,
        id: SessionId,
        records: Vec<Record>,
        start: usize,
        more_available: bool,
    ) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };

        match session.loading_type {
            LoadingType::FetchMore => {
                let outstanding =
                    session.state == SessionState::Fetching && start == session.fetch_start;
                if start != session.fetched_count {
                    if !outstanding {
                        warn!(
                            session = %id,
                            start,
                            expected = session.fetched_count,
                            "dropping rows that do not continue the window"
                        );
                        return;
                    }
                    // A diff moved the window end while this reply was in
                    // flight.
                    debug!(
                        session = %id,
                        start,
                        expected = session.fetched_count,
                        "dropping outdated rows and fetching again"
                    );
                    session.state = SessionState::Idle;
                    if let Some(backend) = self.backend.as_mut() {
                        request_more(&mut **backend, session);
                    }
                    return;
                }
                if outstanding {
                    session.state = SessionState::Idle;
                }
                session.more_available = more_available;
                if records.is_empty() {
                    return;
                }
                let range = session.window.append(records);
                session.update_fetched_count();
                self.notifications.push(Notification::RowsInserted {
                    session: id,
                    start: range.start,
                    count: range.len(),
                });
            }
            LoadingType::CountKnown => {
                let fits = start
                    .checked_add(records.len())
                    .is_some_and(|end| end <= session.window.len());
                if !fits {
                    warn!(
                        session = %id,
                        start,
                        rows = records.len(),
                        count = session.window.len(),
                        "CountChanged must be sent before DataFetched; dropping rows"
                    );
                    return;
                }
                let range = match session.window.fill(start, records) {
                    Ok(range) => range,
                    Err(e) => {
                        warn!(session = %id, error = %e, "dropping rows");
                        return;
                    }
                };
                session.more_available = more_available;
                session.mark_available(range.start, range.end);
                session.update_fetched_count();
                if !range.is_empty() {
                    self.notifications.push(Notification::RowsChanged {
                        session: id,
                        start: range.start,
                        count: range.len(),
                    });
                }
            }
        }
    }

    fn on_count_changed(&mut self, id: SessionId, count: usize) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        if session.loading_type != LoadingType::CountKnown {
            debug!(session = %id, count, "ignoring row count in fetch-more mode");
            return;
        }

        let old = session.window.len();
        if count == old {
            return;
        }
        session.window.resize(count);
        if count < old {
            session.forward_flags.truncate(count);
            session.truncate_chunks(count);
            self.notifications.push(Notification::RowsRemoved {
                session: id,
                start: count,
                count: old - count,
            });
        } else {
            self.notifications.push(Notification::RowsInserted {
                session: id,
                start: old,
                count: count - old,
            });
        }
        session.update_fetched_count();
    }

    fn on_data_changed(&mut self, id: SessionId, records: Vec<Record>, start: usize, count: usize) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };

        let added = records.len();
        let summary = match session.window.apply_diff(records, start, count) {
            Ok(summary) => summary,
            Err(e) => {
                warn!(session = %id, error = %e, "dropping diff");
                return;
            }
        };
        session.splice_forward_flags(start, count, added);
        session.update_fetched_count();

        // An outstanding fetch-more reply stays expected; on_data_fetched
        // notices the window end moved and fetches again.
        if added != count && session.loading_type == LoadingType::CountKnown {
            // Chunk numbers shifted.
            session.available_chunks.clear();
            let len = session.window.len();
            session.mark_available(0, len);
            session.requested_chunks = session.available_chunks.clone();
        } else if session.loading_type == LoadingType::CountKnown {
            session.mark_available(summary.changed.start, summary.changed.end);
        }

        let changes = [
            (summary.changed, RowChange::Changed),
            (summary.removed, RowChange::Removed),
            (summary.inserted, RowChange::Inserted),
        ];
        for (range, change) in changes {
            if range.is_empty() {
                continue;
            }
            let (start, count) = (range.start, range.len());
            self.notifications.push(match change {
                RowChange::Changed => Notification::RowsChanged { session: id, start, count },
                RowChange::Removed => Notification::RowsRemoved { session: id, start, count },
                RowChange::Inserted => Notification::RowsInserted { session: id, start, count },
            });
        }
    }

    fn poll_navigations(&mut self) -> usize {
        if self.navigations.is_empty() {
            return 0;
        }
        let (done, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.navigations)
            .into_iter()
            .partition(|nav| nav.reply.is_resolved());
        self.navigations = pending;

        let resolved = done.len();
        for nav in done {
            match nav.reply.state() {
                ReplyState::Success(content_type) => {
                    debug!(session = %nav.session, %content_type, "navigation resolved");
                    if let Err(e) = self.set_content_type(nav.session, &content_type) {
                        warn!(session = %nav.session, error = %e, "cannot apply navigation");
                    }
                }
                _ => {
                    warn!(session = %nav.session, "navigation failed");
                    self.notifications
                        .push(Notification::NavigationFailed { session: nav.session });
                }
            }
        }
        resolved
    }
}
