//! One-shot loopback listener for the provider's login callback
//!
//! Serves the redirect URI's path on its loopback host and port until the
//! first callback arrives, then shuts down and hands back `code` and `state`.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};
use url::{Host, Url};

use crate::error::{Error, Result};

/// Parameters the provider appends to the redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackQuery {
    fn into_params(self) -> Result<CallbackParams> {
        if let Some(error) = self.error {
            let detail = match self.error_description {
                Some(description) => format!("{error}: {description}"),
                None => error,
            };
            return Err(Error::Provider(detail));
        }
        match (self.code, self.state) {
            (Some(code), Some(state)) if !code.is_empty() => Ok(CallbackParams { code, state }),
            _ => Err(Error::MissingParams),
        }
    }
}

type Pending = Arc<Mutex<Option<oneshot::Sender<Result<CallbackParams>>>>>;

/// Socket address to listen on for `redirect_uri`.
///
/// Only plain-http loopback redirect URIs can be served locally; anything
/// else returns `None` and the login must be completed with `--code`.
pub fn listen_addr(redirect_uri: &Url) -> Option<SocketAddr> {
    if redirect_uri.scheme() != "http" {
        return None;
    }
    let port = redirect_uri.port_or_known_default()?;
    match redirect_uri.host()? {
        Host::Ipv4(ip) if ip.is_loopback() => Some(SocketAddr::from((ip, port))),
        Host::Ipv6(ip) if ip.is_loopback() => Some(SocketAddr::from((ip, port))),
        Host::Domain("localhost") => Some(SocketAddr::from(([127, 0, 0, 1], port))),
        _ => None,
    }
}

/// Bind the redirect URI's address and wait for the first callback.
pub async fn wait_for_callback(redirect_uri: &Url, timeout: Duration) -> Result<CallbackParams> {
    let addr = listen_addr(redirect_uri).ok_or_else(|| {
        Error::Listener(format!("{redirect_uri} is not a loopback http address"))
    })?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Listener(format!("binding {addr}: {e}")))?;
    info!(%addr, path = redirect_uri.path(), "waiting for login callback");
    serve_once(listener, redirect_uri.path(), timeout).await
}

async fn serve_once(
    listener: TcpListener,
    path: &str,
    timeout: Duration,
) -> Result<CallbackParams> {
    let (tx, rx) = oneshot::channel();
    let pending: Pending = Arc::new(Mutex::new(Some(tx)));
    let app = Router::new()
        .route(path, get(receive))
        .with_state(pending);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    let outcome = tokio::time::timeout(timeout, rx).await;
    let _ = stop_tx.send(());
    // Browsers hold keep-alive connections open; don't wait on them.
    server.abort();

    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(Error::Listener("callback listener stopped".into())),
        Err(_) => Err(Error::Timeout),
    }
}

async fn receive(
    State(pending): State<Pending>,
    Query(query): Query<CallbackQuery>,
) -> (StatusCode, &'static str) {
    let result = query.into_params();
    let response = match &result {
        Ok(_) => (StatusCode::OK, "Login received. You can close this tab."),
        Err(e) => {
            warn!(error = %e, "login callback rejected");
            (
                StatusCode::BAD_REQUEST,
                "Login failed. Return to the terminal for details.",
            )
        }
    };

    let sender = pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(sender) = sender {
        let _ = sender.send(result);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn listen() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        (listener, base)
    }

    #[test]
    fn listen_addr_accepts_loopback_http() {
        let url = Url::parse("http://127.0.0.1:8765/auth/callback").unwrap();
        assert_eq!(listen_addr(&url), Some("127.0.0.1:8765".parse().unwrap()));

        let url = Url::parse("http://localhost:9000/cb").unwrap();
        assert_eq!(listen_addr(&url), Some("127.0.0.1:9000".parse().unwrap()));

        let url = Url::parse("http://[::1]:9000/cb").unwrap();
        assert_eq!(listen_addr(&url), Some("[::1]:9000".parse().unwrap()));
    }

    #[test]
    fn listen_addr_rejects_remote_or_https() {
        let url = Url::parse("https://127.0.0.1:8765/auth/callback").unwrap();
        assert_eq!(listen_addr(&url), None);

        let url = Url::parse("http://control.example.com/auth/callback").unwrap();
        assert_eq!(listen_addr(&url), None);

        let url = Url::parse("http://10.0.0.5:8765/auth/callback").unwrap();
        assert_eq!(listen_addr(&url), None);
    }

    #[tokio::test]
    async fn callback_yields_code_and_state() {
        let (listener, base) = listen().await;
        let waiting = tokio::spawn(serve_once(
            listener,
            "/auth/callback",
            Duration::from_secs(5),
        ));

        let resp = reqwest::get(format!("{base}/auth/callback?code=abc&state=xyz"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let params = waiting.await.unwrap().unwrap();
        assert_eq!(
            params,
            CallbackParams {
                code: "abc".into(),
                state: "xyz".into()
            }
        );
    }

    #[tokio::test]
    async fn provider_error_is_reported() {
        let (listener, base) = listen().await;
        let waiting = tokio::spawn(serve_once(
            listener,
            "/auth/callback",
            Duration::from_secs(5),
        ));

        let resp = reqwest::get(format!(
            "{base}/auth/callback?error=access_denied&error_description=user%20cancelled"
        ))
        .await
        .unwrap();
        assert_eq!(resp.status(), 400);

        let err = waiting.await.unwrap().unwrap_err();
        assert_eq!(
            err.to_string(),
            "identity provider returned an error: access_denied: user cancelled"
        );
    }

    #[tokio::test]
    async fn missing_code_is_rejected() {
        let (listener, base) = listen().await;
        let waiting = tokio::spawn(serve_once(
            listener,
            "/auth/callback",
            Duration::from_secs(5),
        ));

        reqwest::get(format!("{base}/auth/callback?state=xyz"))
            .await
            .unwrap();

        let err = waiting.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::MissingParams));
    }

    #[tokio::test]
    async fn gives_up_after_timeout() {
        let (listener, _base) = listen().await;
        let err = serve_once(listener, "/auth/callback", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }
}
