//! Error types for the simulation backend and CLI.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lens(#[from] lens::Error),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
