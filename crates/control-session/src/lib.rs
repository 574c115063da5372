//! Login session orchestration for the control-plane client
//!
//! Drives the Authorization Code + PKCE flow and owns the session lifecycle:
//!
//! ```text
//! Anonymous --start_login--> AwaitingCallback --handle_callback--> Authenticated
//!     ^                                                               |
//!     +------------------- logout / rejected credential --------------+
//! ```
//!
//! `AwaitingCallback` is left by navigating away, not by an in-process
//! transition: `start_login` returns a `Redirect` and the next step happens
//! in whatever process receives the provider's callback.
//!
//! The route guard reads the same shared `SessionState` synchronously.

pub mod error;
pub mod guard;
pub mod init;
pub mod session;

pub use error::{Error, Result};
pub use guard::{GuardDecision, RouteMeta, check};
pub use init::spawn_init;
pub use session::{AuthSession, SessionConfig};

#[cfg(test)]
mod testing;
