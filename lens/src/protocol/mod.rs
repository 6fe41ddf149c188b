//! Interface between the browser and a data source.
//!
//! The browser calls [`Backend`] methods; the backend answers later by
//! sending [`BackendEvent`]s through the [`EventSink`] it was given in
//! [`Backend::initialize`]. Requests that produce a single result (navigation
//! and item operations) return a [`PendingReply`] instead.

mod event;
mod reply;

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::query::{OrderTerm, Term};
use crate::schema::{Record, SessionId};

pub use event::{channel, BackendEvent, EventSink};
pub use reply::{PendingReply, ReplyState};

/// Features a backend supports, as a bit set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ModelCapabilities(u32);

impl ModelCapabilities {
    pub const NO_EXTRAS: Self = Self(0);
    /// The total row count is reported up front (`CountChanged`).
    pub const SUPPORTS_GET_SIZE: Self = Self(1 << 0);
    pub const SUPPORTS_FILTERING: Self = Self(1 << 1);
    pub const SUPPORTS_SORTING: Self = Self(1 << 2);
    pub const SUPPORTS_AND_CONJUNCTION: Self = Self(1 << 3);
    pub const SUPPORTS_OR_CONJUNCTION: Self = Self(1 << 4);
    /// Navigation may open an independent session.
    pub const SUPPORTS_STATELESS_NAVIGATION: Self = Self(1 << 5);
    pub const SUPPORTS_INSERT: Self = Self(1 << 6);
    pub const SUPPORTS_MOVE: Self = Self(1 << 7);
    pub const SUPPORTS_REMOVE: Self = Self(1 << 8);

    const NAMES: [(Self, &'static str); 9] = [
        (Self::SUPPORTS_GET_SIZE, "get-size"),
        (Self::SUPPORTS_FILTERING, "filtering"),
        (Self::SUPPORTS_SORTING, "sorting"),
        (Self::SUPPORTS_AND_CONJUNCTION, "and-conjunction"),
        (Self::SUPPORTS_OR_CONJUNCTION, "or-conjunction"),
        (Self::SUPPORTS_STATELESS_NAVIGATION, "stateless-navigation"),
        (Self::SUPPORTS_INSERT, "insert"),
        (Self::SUPPORTS_MOVE, "move"),
        (Self::SUPPORTS_REMOVE, "remove"),
    ];

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Names of the set flags.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for ModelCapabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ModelCapabilities {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ModelCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelCapabilities({})", self.names().join(" | "))
    }
}

/// A data source that streams rows to the browser.
///
/// Every request carries the id of the session it belongs to. Answers are
/// sent through the sink passed to [`initialize`](Self::initialize), in the
/// order the requests of one session were made.
pub trait Backend {
    /// Store the sink and announce content types and capabilities. Should
    /// end with [`BackendEvent::InitializationDone`].
    fn initialize(&mut self, sink: EventSink);

    fn register_instance(&mut self, _session: SessionId) {}

    fn unregister_instance(&mut self, _session: SessionId) {}

    /// Switch the content type. Answered by `ContentTypeChanged`, usually
    /// preceded by `QueryIdentifiersChanged` and `CanGoBackChanged`.
    fn set_content_type(&mut self, session: SessionId, content_type: &str);

    /// Filter and order used by subsequent fetches. No direct answer.
    fn setup_filter(&mut self, session: SessionId, filter: Option<&Term>, order: &[OrderTerm]);

    /// Request `count` rows from `start`. Answered by `DataFetched`.
    fn fetch_data(&mut self, session: SessionId, start: usize, count: usize);

    /// Resolve the content type reached by selecting row `index`.
    fn go_forward(&mut self, session: SessionId, index: usize) -> PendingReply<String>;

    /// Resolve the parent content type.
    fn go_back(&mut self, session: SessionId) -> PendingReply<String>;

    fn insert(&mut self, _session: SessionId, _index: usize, _record: &Record) -> PendingReply<()> {
        PendingReply::failed()
    }

    fn remove(&mut self, _session: SessionId, _index: usize) -> PendingReply<()> {
        PendingReply::failed()
    }

    fn move_item(&mut self, _session: SessionId, _from: usize, _to: usize) -> PendingReply<()> {
        PendingReply::failed()
    }

    fn index_of(&mut self, _session: SessionId, _record: &Record) -> PendingReply<usize> {
        PendingReply::failed()
    }
}
