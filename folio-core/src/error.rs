//! Error types for Folio Core

use thiserror::Error;

/// Result type alias using FolioError
pub type Result<T> = std::result::Result<T, FolioError>;

/// Top-level error type for all Folio operations
#[derive(Debug, Error)]
pub enum FolioError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Rebuild error: {0}")]
    Rebuild(#[from] RebuildError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur while reading containers or source payloads
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Invalid package document: {0}")]
    InvalidPackage(String),

    #[error("Missing required entry: {0}")]
    MissingEntry(String),

    #[error("Malformed JSON: {0}")]
    MalformedJson(String),
}

/// Errors raised by the request client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP status {code}: {url}")]
    Status { code: u16, url: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl NetworkError {
    /// Transport failures, timeouts, throttling and 5xx responses are retried.
    /// Not-found, other 4xx and malformed bodies are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::Transport(_) | NetworkError::Timeout(_) => true,
            NetworkError::Status { code, .. } => {
                matches!(code, 408 | 429) || (500..600).contains(code)
            }
            NetworkError::NotFound(_) | NetworkError::Malformed(_) => false,
        }
    }

    /// Whether this error means "no data" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, NetworkError::NotFound(_))
    }
}

/// Errors raised while rebuilding a container
#[derive(Debug, Error)]
pub enum RebuildError {
    #[error("Cannot read original container: {0}")]
    ReadOriginal(#[source] ParseError),

    #[error("Serialization failed: {0}")]
    Serialize(String),

    #[error("Writing temporary file failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("Atomic replace failed: {0}")]
    Replace(#[source] std::io::Error),

    #[error("Another rebuild of {0} is in progress")]
    Busy(String),

    #[error("Backup failed: {0}")]
    Backup(String),
}

/// Errors raised by the cover cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    #[error("Backend error: {0}")]
    BackendError(String),
}
