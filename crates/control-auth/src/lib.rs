//! Control-plane login primitives
//!
//! PKCE generation, the injected platform capabilities (randomness, hashing,
//! key/value storage), and the shared session state that both the API
//! transport and the session orchestrator read and tear down.
//!
//! Login flow:
//! 1. `pkce::generate_verifier()` + `pkce::derive_challenge()` + `pkce::generate_state()`
//! 2. Browser follows `pkce::build_authorization_url()` to the identity provider
//! 3. Backend exchanges the returned code (see the `control-api` crate)
//! 4. Tokens absorbed via `SessionState::store_tokens()`
//! 5. `SessionState::teardown()` on logout or a rejected credential

pub mod constants;
pub mod error;
pub mod navigation;
pub mod pkce;
pub mod platform;
pub mod session_state;
pub mod storage;
pub mod token;
pub mod user;

pub use constants::*;
pub use error::{Error, Result};
pub use navigation::Redirect;
pub use pkce::{
    IdentityProvider, build_authorization_url, build_end_session_url, compute_challenge,
    derive_challenge, generate_state, generate_verifier,
};
pub use platform::{Crypto, SystemCrypto};
pub use session_state::SessionState;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use token::{ExchangeRequest, TokenResponse};
pub use user::User;
