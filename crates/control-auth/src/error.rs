//! Error types for storage and URL construction

/// Errors from login primitives.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("storage parse error: {0}")]
    StorageParse(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Result alias for login primitives.
pub type Result<T> = std::result::Result<T, Error>;
