//! tsim: an in-memory simulation backend for the lens browse engine.
//!
//! [`MemoryBackend`] serves a [`Dataset`] loaded from JSON, evaluating query
//! terms against record fields and resolving drill-down paths through the
//! dataset's content type hierarchy.

pub mod backend;
pub mod dataset;
pub mod error;
pub mod filter;

pub use backend::MemoryBackend;
pub use dataset::Dataset;
pub use error::{Error, Result};
