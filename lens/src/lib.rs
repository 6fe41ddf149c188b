//! Lens: query language and windowed browse engine.
//!
//! A client describes the subset and order of a backend dataset it wants
//! with a small query language (`artist='Muse' & year>=2005 [/name]`) and
//! reads the result as a window that the backend fills chunk by chunk.

pub mod browse;
pub mod config;
pub mod error;
pub mod protocol;
pub mod query;
pub mod schema;

pub use browse::{Browser, LoadingType, NavigationType, Navigated, Notification, Read, Session};
pub use config::Config;
pub use error::{Error, Result};
pub use protocol::{Backend, BackendEvent, EventSink, ModelCapabilities, PendingReply};
pub use query::{parse, OrderTerm, ParsedQuery, QueryParser, Term};
pub use schema::{Record, SessionId};
