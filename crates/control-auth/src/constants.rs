//! OAuth and storage constants
//!
//! The client is a public OAuth client: nothing here is a secret. Storage key
//! names are shared with any other client instance reading the same storage.

/// Durable storage key for the bearer access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Durable storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Short-lived storage key for the one-time PKCE verifier
pub const PKCE_VERIFIER_KEY: &str = "pkce_verifier";

/// Short-lived storage key for the anti-replay `state` value
pub const OAUTH_STATE_KEY: &str = "oauth_state";

/// Scopes requested on every authorization request
pub const SCOPES: &str = "openid email profile";

/// The only supported challenge method. There is no `plain` fallback.
pub const CHALLENGE_METHOD: &str = "S256";

/// Verifier length in characters
pub const VERIFIER_LENGTH: usize = 128;

/// Groups granting the elevated (admin) role
pub const ADMIN_GROUPS: &[&str] = &["admins", "vpn-admins"];

/// Identity provider endpoints, relative to the issuer URL
pub const AUTHORIZE_PATH: &str = "authorize/";
pub const END_SESSION_PATH: &str = "end-session/";

/// Backend endpoint performing the authorization code exchange
pub const TOKEN_EXCHANGE_PATH: &str = "/auth/callback";

/// Backend endpoint returning the current user's profile
pub const PROFILE_PATH: &str = "/api/v1/control/me";

/// In-app login route, the destination after a rejected credential
pub const LOGIN_PATH: &str = "/login";

/// In-app landing route for authenticated users
pub const DASHBOARD_PATH: &str = "/";
