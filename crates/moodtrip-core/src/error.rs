//! Error types for MoodTrip.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A single external call failed (non-2xx, transport error, timeout, empty body).
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Model output was not in the expected shape.
    #[error("Parse failure: {0}")]
    ParseFailure(String),

    /// Every keyword extraction strategy for the input was exhausted.
    #[error("Keyword extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The request does not fit the resource's current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error should abort the keyword stage of the pipeline.
    pub fn is_fatal_for_extraction(&self) -> bool {
        matches!(self, Error::ExtractionFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
