//! Per-session browse state.

use std::collections::BTreeSet;

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

use super::path;
use super::window::Window;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::protocol::ModelCapabilities;
use crate::query::{OrderTerm, Term};
use crate::schema::{Record, SessionId};

/// How rows are loaded into the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadingType {
    /// The window grows chunk by chunk as the client reads near its end.
    #[default]
    FetchMore,
    /// The backend reports the total count first; the window is allocated
    /// with placeholders that are filled chunk by chunk on access.
    CountKnown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// A fetch-more request is outstanding.
    Fetching,
    /// Waiting for the backend to acknowledge a content type.
    SwitchingContentType,
}

/// Where [`Browser::go_forward`](super::Browser::go_forward) shows the
/// selected row's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationType {
    /// Replace the contents of the current session.
    InModel,
    /// Open a new session; requires stateless navigation support.
    OutOfModel,
}

/// One browse instance. Mutated only by the [`Browser`](super::Browser).
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) id: SessionId,
    pub(crate) content_type: String,
    pub(crate) content_type_requested: String,
    pub(crate) query: String,
    pub(crate) filter: Option<Term>,
    pub(crate) order: Vec<OrderTerm>,
    pub(crate) query_identifiers: BTreeSet<String>,
    pub(crate) window: Window,
    pub(crate) fetched_count: usize,
    pub(crate) more_available: bool,
    pub(crate) chunk_size: usize,
    pub(crate) fetch_threshold: usize,
    pub(crate) loading_type: LoadingType,
    pub(crate) capabilities: ModelCapabilities,
    pub(crate) forward_flags: Vec<bool>,
    pub(crate) back_allowed: bool,
    pub(crate) state: SessionState,
    /// First row of the outstanding fetch-more request while `Fetching`.
    pub(crate) fetch_start: usize,
    /// Chunks requested in count-known mode.
    pub(crate) requested_chunks: RoaringBitmap,
    /// Chunks whose rows arrived in count-known mode.
    pub(crate) available_chunks: RoaringBitmap,
}

impl Session {
    pub(crate) fn new(id: SessionId, config: &Config) -> Self {
        Self {
            id,
            content_type: String::new(),
            content_type_requested: String::new(),
            query: String::new(),
            filter: None,
            order: Vec::new(),
            query_identifiers: BTreeSet::new(),
            window: Window::new(),
            fetched_count: 0,
            more_available: false,
            chunk_size: config.chunk_size,
            fetch_threshold: config.fetch_threshold,
            loading_type: config.loading_type,
            capabilities: ModelCapabilities::NO_EXTRAS,
            forward_flags: Vec::new(),
            back_allowed: false,
            state: SessionState::Idle,
            fetch_start: 0,
            requested_chunks: RoaringBitmap::new(),
            available_chunks: RoaringBitmap::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Content type acknowledged by the backend.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Content type last requested from the backend.
    pub fn requested_content_type(&self) -> &str {
        &self.content_type_requested
    }

    /// Decoded drill-down path of the current content type.
    pub fn breadcrumbs(&self) -> Result<Vec<path::Segment>> {
        path::segments(&self.content_type)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn filter(&self) -> Option<&Term> {
        self.filter.as_ref()
    }

    pub fn order(&self) -> &[OrderTerm] {
        &self.order
    }

    pub fn query_identifiers(&self) -> &BTreeSet<String> {
        &self.query_identifiers
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn row_count(&self) -> usize {
        self.window.len()
    }

    /// Row data if it has arrived. Unlike
    /// [`Browser::read`](super::Browser::read) this never fetches.
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.window.get(index)
    }

    /// Rows whose data has arrived.
    pub fn fetched_count(&self) -> usize {
        self.fetched_count
    }

    pub fn more_available(&self) -> bool {
        self.more_available
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn fetch_threshold(&self) -> usize {
        self.fetch_threshold
    }

    pub fn loading_type(&self) -> LoadingType {
        self.loading_type
    }

    pub fn capabilities(&self) -> ModelCapabilities {
        self.capabilities
    }

    pub fn can_go_forward(&self, index: usize) -> bool {
        self.forward_flags.get(index).copied().unwrap_or(false)
    }

    pub fn can_go_back(&self) -> bool {
        self.back_allowed
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_chunk_available(&self, chunk: usize) -> bool {
        self.available_chunks.contains(chunk_key(chunk))
    }

    pub(crate) fn chunk_of(&self, index: usize) -> usize {
        index / self.chunk_size.max(1)
    }

    /// Forget all rows and chunk bookkeeping.
    pub(crate) fn reset_window(&mut self) {
        self.window.clear();
        self.forward_flags.clear();
        self.fetched_count = 0;
        self.more_available = false;
        self.requested_chunks.clear();
        self.available_chunks.clear();
    }

    /// Forget query state tied to the current content type.
    pub(crate) fn clear_query(&mut self) {
        self.query.clear();
        self.filter = None;
        self.order.clear();
        self.query_identifiers.clear();
        self.forward_flags.clear();
        self.back_allowed = false;
    }

    pub(crate) fn update_fetched_count(&mut self) {
        self.fetched_count = self.window.filled();
    }

    /// Write drill-down flags for rows `start..`, growing the flag list as
    /// needed. The rows must be inside the window.
    pub(crate) fn set_forward_flags(&mut self, start: usize, flags: &[bool]) -> Result<()> {
        let end = match start.checked_add(flags.len()) {
            Some(end) if end <= self.window.len() => end,
            _ => {
                return Err(Error::Protocol(format!(
                    "{} forward flags at {} outside of window of {} rows",
                    flags.len(),
                    start,
                    self.window.len()
                )))
            }
        };
        if self.forward_flags.len() < end {
            self.forward_flags.resize(end, false);
        }
        self.forward_flags[start..end].copy_from_slice(flags);
        Ok(())
    }

    /// Keep drill-down flags aligned with a window diff: the `count` rows at
    /// `start` become `added` rows without flags.
    pub(crate) fn splice_forward_flags(&mut self, start: usize, count: usize, added: usize) {
        if self.forward_flags.len() < start + count {
            self.forward_flags.resize(start + count, false);
        }
        self.forward_flags
            .splice(start..start + count, std::iter::repeat(false).take(added));
    }

    /// Drop chunk bits at or beyond `len` rows.
    pub(crate) fn truncate_chunks(&mut self, len: usize) {
        let first_gone = chunk_key(len.div_ceil(self.chunk_size.max(1)));
        self.requested_chunks.remove_range(first_gone..);
        self.available_chunks.remove_range(first_gone..);
    }

    /// Mark the chunks covering `rows` as arrived.
    pub(crate) fn mark_available(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let first = self.chunk_of(start);
        let last = self.chunk_of(end - 1);
        for chunk in first..=last {
            let chunk_start = chunk * self.chunk_size;
            let chunk_end = (chunk_start + self.chunk_size).min(self.window.len());
            let complete = (chunk_start..chunk_end).all(|i| !self.window.is_placeholder(i));
            if complete {
                self.available_chunks.insert(chunk_key(chunk));
            }
        }
    }
}

pub(crate) fn chunk_key(chunk: usize) -> u32 {
    u32::try_from(chunk).unwrap_or(u32::MAX)
}
