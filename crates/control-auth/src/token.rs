//! Token exchange wire types
//!
//! The backend performs the confidential half of the code exchange with the
//! identity provider and hands the resulting tokens back. Only the token
//! fields are kept; the response itself is never stored.

use serde::{Deserialize, Serialize};

/// Body of the code exchange request.
#[derive(Debug, Serialize)]
pub struct ExchangeRequest<'a> {
    pub code: &'a str,
    pub redirect_uri: &'a str,
    pub code_verifier: &'a str,
}

/// Tokens returned by a successful exchange.
///
/// `expires_in` is a delta in seconds. It is informational only: expiry is
/// discovered when a request is rejected, never tracked proactively.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}
