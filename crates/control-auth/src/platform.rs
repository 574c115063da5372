//! Injected platform capabilities
//!
//! PKCE generation and the session depend on randomness and hashing only
//! through `Crypto`, so tests can substitute deterministic values.

use rand::RngExt;
use sha2::{Digest, Sha256};

/// Cryptographic primitives supplied by the host platform.
pub trait Crypto: Send + Sync {
    /// Fill a fresh buffer of `len` bytes from a cryptographically secure source.
    ///
    /// Implementations must return exactly `len` bytes and must never reuse
    /// output across calls.
    fn secure_random_bytes(&self, len: usize) -> Vec<u8>;

    /// SHA-256 digest of `data`.
    fn sha256(&self, data: &[u8]) -> [u8; 32];
}

/// Production capabilities: thread-local CSPRNG and `sha2`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCrypto;

impl Crypto for SystemCrypto {
    fn secure_random_bytes(&self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        rand::rng().fill(bytes.as_mut_slice());
        bytes
    }

    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }
}
