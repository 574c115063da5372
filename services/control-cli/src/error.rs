//! CLI-specific error types

use thiserror::Error;

/// Failures of the local callback listener.
///
/// Session and transport failures keep their own types from
/// `control-session` and are reported through `anyhow` at the command level.
#[derive(Error, Debug)]
pub enum Error {
    #[error("callback listener failed: {0}")]
    Listener(String),

    #[error("identity provider returned an error: {0}")]
    Provider(String),

    #[error("callback is missing the authorization code or state")]
    MissingParams,

    #[error("timed out waiting for the login callback")]
    Timeout,
}

/// Result alias using CLI Error
pub type Result<T> = std::result::Result<T, Error>;
