//! Error taxonomy for backend calls

use control_auth::Redirect;

/// Errors from backend calls.
///
/// Only `Unauthorized` has a side effect (session teardown, performed once by
/// the client). Everything else propagates unchanged for the caller to present.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport could not complete the request
    #[error("network failure: {0}")]
    Network(String),

    /// The backend rejected the bearer credential (HTTP 401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Non-success status, or an explicit `error` in the envelope
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The response did not have the expected shape
    #[error("unexpected response: {0}")]
    Validation(String),
}

impl Error {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized)
    }

    /// Navigation the calling layer must perform for this error, if any.
    pub fn redirect(&self) -> Option<Redirect> {
        self.is_unauthorized().then_some(Redirect::Login)
    }
}

/// Result alias for backend calls.
pub type Result<T> = std::result::Result<T, Error>;
