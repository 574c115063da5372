//! Authenticated transport for the control-plane backend
//!
//! Every call goes through `ApiClient`, which attaches the bearer token from
//! the shared `SessionState`, unwraps the backend's `{ok, data, error}`
//! envelope and classifies failures. A 401 tears the session down before the
//! error reaches the caller; the caller then performs the returned
//! `Redirect::Login`.
//!
//! `exchange_code` is the one unauthenticated entry point: it runs before any
//! session exists.

pub mod client;
pub mod error;

pub use client::{ApiClient, RequestOptions};
pub use error::{Error, Result};
