//! PKCE (Proof Key for Code Exchange) implementation per RFC 7636
//!
//! Generates the per-attempt verifier, its S256 challenge and the anti-replay
//! `state`, and builds the identity provider URLs that carry them. The
//! verifier stays in short-lived storage until the code exchange; only the
//! challenge leaves the client up front.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use url::Url;

use crate::constants::{
    AUTHORIZE_PATH, CHALLENGE_METHOD, END_SESSION_PATH, SCOPES, VERIFIER_LENGTH,
};
use crate::error::{Error, Result};
use crate::platform::{Crypto, SystemCrypto};

/// Public OAuth client registration at the identity provider.
#[derive(Debug, Clone)]
pub struct IdentityProvider {
    /// Issuer base URL; `authorize/` and `end-session/` hang off it
    pub issuer: Url,
    pub client_id: String,
    /// Where the provider sends the browser back with `code` and `state`
    pub redirect_uri: Url,
}

/// Generate a fresh PKCE code verifier.
///
/// 64 random bytes rendered as 128 lowercase hex characters. Hex digits are a
/// subset of the RFC 7636 unreserved set, and 128 is the maximum allowed length.
pub fn generate_verifier(crypto: &dyn Crypto) -> String {
    crypto
        .secure_random_bytes(VERIFIER_LENGTH / 2)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Derive the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL-NOPAD(SHA256(verifier))`
pub fn derive_challenge(crypto: &dyn Crypto, verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(crypto.sha256(verifier.as_bytes()))
}

/// `derive_challenge` with the system hash implementation.
pub fn compute_challenge(verifier: &str) -> String {
    derive_challenge(&SystemCrypto, verifier)
}

/// Generate the opaque `state` value as a random (v4) UUID.
pub fn generate_state(crypto: &dyn Crypto) -> String {
    let mut bytes = [0u8; 16];
    let random = crypto.secure_random_bytes(bytes.len());
    debug_assert_eq!(random.len(), bytes.len());
    for (dst, src) in bytes.iter_mut().zip(random) {
        *dst = src;
    }
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string()
}

/// Build the authorization request URL.
///
/// Carries `response_type=code`, the client registration, the fixed scope,
/// the S256 challenge and `state`.
pub fn build_authorization_url(
    provider: &IdentityProvider,
    challenge: &str,
    state: &str,
) -> Result<Url> {
    let mut url = issuer_endpoint(&provider.issuer, AUTHORIZE_PATH)?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &provider.client_id)
        .append_pair("redirect_uri", provider.redirect_uri.as_str())
        .append_pair("scope", SCOPES)
        .append_pair("code_challenge", challenge)
        .append_pair("code_challenge_method", CHALLENGE_METHOD)
        .append_pair("state", state);
    Ok(url)
}

/// Build the end-session URL that returns the browser to `post_logout_redirect`.
pub fn build_end_session_url(
    provider: &IdentityProvider,
    post_logout_redirect: &Url,
) -> Result<Url> {
    let mut url = issuer_endpoint(&provider.issuer, END_SESSION_PATH)?;
    url.query_pairs_mut()
        .append_pair("post_logout_redirect_uri", post_logout_redirect.as_str());
    Ok(url)
}

fn issuer_endpoint(issuer: &Url, path: &str) -> Result<Url> {
    let raw = format!("{}/{path}", issuer.as_str().trim_end_matches('/'));
    Url::parse(&raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn provider() -> IdentityProvider {
        IdentityProvider {
            issuer: Url::parse("https://auth.example.com/application/o/control").unwrap(),
            client_id: "control-panel".into(),
            redirect_uri: Url::parse("https://control.example.com/auth/callback").unwrap(),
        }
    }

    fn query(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn verifier_is_128_hex_chars() {
        let verifier = generate_verifier(&SystemCrypto);
        assert_eq!(verifier.len(), 128);
        assert!(
            verifier.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()),
            "verifier must be lowercase hex: {verifier}"
        );
    }

    #[test]
    fn verifiers_are_unique() {
        let a = generate_verifier(&SystemCrypto);
        let b = generate_verifier(&SystemCrypto);
        assert_ne!(a, b, "two verifiers must not collide");
    }

    #[test]
    fn challenge_is_deterministic() {
        let c1 = compute_challenge("test-verifier-value");
        let c2 = compute_challenge("test-verifier-value");
        assert_eq!(c1, c2, "same verifier must produce same challenge");
        assert_ne!(c1, compute_challenge("other-verifier"));
    }

    #[test]
    fn challenge_matches_rfc7636_appendix_b() {
        let challenge = compute_challenge("dBjftJeZ4CVP-mA3oGFHdNjq0zV6rUZWE2uMJd6aHAc");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn challenge_is_unpadded_base64url_of_32_bytes() {
        let challenge = compute_challenge(&generate_verifier(&SystemCrypto));
        assert_eq!(challenge.len(), 43);
        let decoded = URL_SAFE_NO_PAD.decode(&challenge).expect("valid base64url");
        assert_eq!(decoded.len(), 32, "SHA-256 hash must be 32 bytes");
    }

    #[test]
    fn state_is_v4_uuid() {
        let state = generate_state(&SystemCrypto);
        let parsed = uuid::Uuid::parse_str(&state).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert_ne!(state, generate_state(&SystemCrypto));
    }

    #[test]
    fn authorization_url_contains_required_params() {
        let challenge = compute_challenge("test-verifier");
        let url = build_authorization_url(&provider(), &challenge, "state-123").unwrap();

        assert_eq!(url.path(), "/application/o/control/authorize/");
        let params = query(&url);
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "control-panel");
        assert_eq!(
            params["redirect_uri"],
            "https://control.example.com/auth/callback"
        );
        assert_eq!(params["scope"], "openid email profile");
        assert_eq!(params["code_challenge"], challenge);
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["state"], "state-123");
    }

    #[test]
    fn issuer_trailing_slash_is_not_doubled() {
        let mut provider = provider();
        provider.issuer = Url::parse("https://auth.example.com/o/control/").unwrap();
        let url = build_authorization_url(&provider, "c", "s").unwrap();
        assert_eq!(url.path(), "/o/control/authorize/");
    }

    #[test]
    fn end_session_url_carries_post_logout_redirect() {
        let login = Url::parse("https://control.example.com/login").unwrap();
        let url = build_end_session_url(&provider(), &login).unwrap();
        assert_eq!(url.path(), "/application/o/control/end-session/");
        assert_eq!(
            query(&url)["post_logout_redirect_uri"],
            "https://control.example.com/login"
        );
    }
}
