//! Error types for coderoot

use thiserror::Error;

/// Result type alias using CoderootError
pub type Result<T> = std::result::Result<T, CoderootError>;

/// Error type alias for convenience
pub type Error = CoderootError;

/// Main error type for coderoot
#[derive(Debug, Error)]
pub enum CoderootError {
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Collection limit reached: {0}")]
    CollectionLimit(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Indexing error: {0}")]
    Indexing(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),
}

impl CoderootError {
    /// True for the capacity signal that callers must treat as terminal
    /// and non-retryable rather than as a failure.
    pub fn is_collection_limit(&self) -> bool {
        matches!(self, Self::CollectionLimit(_))
    }
}
