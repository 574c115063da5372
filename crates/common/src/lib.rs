//! Common types shared by the control-plane login client crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
