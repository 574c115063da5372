//! Error types for session operations

use control_auth::Redirect;

/// Errors from session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] control_api::Error),

    #[error(transparent)]
    Auth(#[from] control_auth::Error),

    /// No verifier in short-lived storage: no login pending, or already consumed
    #[error("no pending login (PKCE verifier missing or already used)")]
    MissingVerifier,

    /// The callback's `state` does not match the pending login
    #[error("state mismatch: callback does not belong to the pending login")]
    StateMismatch,
}

impl Error {
    /// Navigation the calling layer must perform for this error, if any.
    pub fn redirect(&self) -> Option<Redirect> {
        match self {
            Error::Api(e) => e.redirect(),
            _ => None,
        }
    }
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
