//! Backend request transport
//!
//! Wire contract:
//! - request `Authorization: Bearer <access_token>` whenever durable storage
//!   holds a token, default `Content-Type: application/json`
//! - response envelope `{"ok": bool, "data": T, "error": "..."}`; `ok` mirrors
//!   the status code and is not consulted separately

use std::sync::Arc;

use control_auth::constants::TOKEN_EXCHANGE_PATH;
use control_auth::{ExchangeRequest, SessionState, TokenResponse};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};

/// Fallback message when the token exchange fails without a server message
const EXCHANGE_FAILED: &str = "token exchange failed";

/// Per-call options; caller headers are merged over the defaults.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<String>,
}

impl Envelope {
    fn parse(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }

    fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|message| !message.is_empty())
    }
}

/// Client for the control-plane backend.
///
/// Cheap to clone: the HTTP connection pool and the session state are shared.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionState>,
}

impl ApiClient {
    /// `base_url` is prefixed verbatim to every request path.
    pub fn new(
        base_url: impl Into<String>,
        http: reqwest::Client,
        session: Arc<SessionState>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(path, RequestOptions::default()).await
    }

    pub async fn post<T, B>(&self, path: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| Error::Validation(format!("encoding request body: {e}")))?;
        let options = RequestOptions {
            method: Method::POST,
            body,
            ..RequestOptions::default()
        };
        self.request(path, options).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let options = RequestOptions {
            method: Method::DELETE,
            ..RequestOptions::default()
        };
        self.request(path, options).await
    }

    /// Issue an authenticated call and return the envelope's `data`.
    ///
    /// On 401 the shared session is torn down (memory and durable storage)
    /// before `Error::Unauthorized` is returned; `Error::redirect()` then
    /// yields the login destination. Continuing the current flow after that
    /// is not meaningful.
    #[instrument(skip_all, fields(method = %options.method, path = %path))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(options.headers);

        let token = self.session.durable_access_token();
        if let Some(token) = &token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| Error::Validation(format!("invalid token value: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        debug!(authenticated = token.is_some(), "dispatching request");

        let mut request = self
            .http
            .request(options.method, self.url(path))
            .headers(headers);
        if let Some(body) = options.body {
            request = request.body(body.to_string());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(format!("request to {path} failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("credential rejected, tearing down session");
            self.session.teardown();
            return Err(Error::Unauthorized);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("reading response from {path} failed: {e}")))?;
        let envelope = Envelope::parse(&bytes);

        let server_error = envelope.as_ref().and_then(Envelope::error_message);
        if !status.is_success() || server_error.is_some() {
            let message = server_error
                .map(String::from)
                .unwrap_or_else(|| format!("Request failed: {}", status.as_u16()));
            debug!(status = status.as_u16(), %message, "request failed");
            return Err(Error::Server {
                status: status.as_u16(),
                message,
            });
        }

        let envelope =
            envelope.ok_or_else(|| Error::Validation(format!("{path} did not return JSON")))?;
        serde_json::from_value(envelope.data)
            .map_err(|e| Error::Validation(format!("decoding {path} response: {e}")))
    }

    /// Exchange an authorization code for tokens.
    ///
    /// Unauthenticated: no bearer header is sent even when a
    /// stale token is still in storage, and a rejection never tears the
    /// session down.
    #[instrument(skip_all)]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        verifier: &str,
    ) -> Result<TokenResponse> {
        let body = ExchangeRequest {
            code,
            redirect_uri,
            code_verifier: verifier,
        };
        let body = serde_json::to_string(&body)
            .map_err(|e| Error::Validation(format!("encoding exchange request: {e}")))?;

        let response = self
            .http
            .post(self.url(TOKEN_EXCHANGE_PATH))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Network(format!("token exchange request failed: {e}")))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("reading token exchange response failed: {e}")))?;
        let envelope = Envelope::parse(&bytes);

        if !status.is_success() {
            let message = envelope
                .as_ref()
                .and_then(Envelope::error_message)
                .unwrap_or(EXCHANGE_FAILED)
                .to_string();
            warn!(status = status.as_u16(), %message, "token exchange rejected");
            return Err(Error::Server {
                status: status.as_u16(),
                message,
            });
        }

        let envelope = envelope
            .ok_or_else(|| Error::Validation("token exchange did not return JSON".into()))?;
        serde_json::from_value(envelope.data)
            .map_err(|e| Error::Validation(format!("invalid token response: {e}")))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}
