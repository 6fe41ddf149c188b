//! Windowed browsing of backend data.
//!
//! A [`Browser`] owns any number of sessions. Each session shows one content
//! type of the backend, filtered and sorted by a query, as a window of rows
//! that fills in chunks while the client reads it. Rows can drill down into
//! child content types (artist → album → track).

mod engine;
pub mod path;
mod session;
mod window;

pub use engine::{Browser, Navigated, Notification, Read};
pub use session::{LoadingType, NavigationType, Session, SessionState};
pub use window::{DiffSummary, Window};
