//! Error types for query parsing and browsing.

use crate::query::{LexError, ParseError};
use crate::schema::SessionId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Lex(#[from] LexError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors produced while lexing or parsing a query string.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::Lex(_) | Error::Parse(_))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
