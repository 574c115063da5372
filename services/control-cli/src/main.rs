//! Control-plane login CLI
//!
//! Drives the Authorization Code + PKCE login against the control-plane
//! backend from a terminal:
//! 1. `login` prints the authorize URL and waits on the loopback redirect URI
//! 2. The returned code is exchanged by the backend and the session persisted
//! 3. `whoami` restores the session and loads the profile
//! 4. `logout` tears the session down and prints the end-session URL

mod args;
mod callback;
mod config;
mod error;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use control_api::ApiClient;
use control_auth::{FileStorage, Redirect, SessionState, Storage, SystemCrypto};
use control_session::{AuthSession, spawn_init};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::args::{Cli, Command};
use crate::config::Config;

const SESSION_FILE: &str = "session.json";
const PENDING_LOGIN_FILE: &str = "pending-login.json";

/// Wire the session against file-backed storage under `state_dir`.
fn build_session(config: &Config) -> Result<Arc<AuthSession>> {
    let state_dir = &config.app.state_dir;
    let durable: Arc<dyn Storage> = Arc::new(
        FileStorage::open(state_dir.join(SESSION_FILE))
            .context("failed to open session storage")?,
    );
    let ephemeral: Arc<dyn Storage> = Arc::new(
        FileStorage::open(state_dir.join(PENDING_LOGIN_FILE))
            .context("failed to open pending login storage")?,
    );

    let state = Arc::new(SessionState::restore(durable));
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.api.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;
    let api = ApiClient::new(config.api.base_url.as_str(), http, state);

    let session = AuthSession::new(
        config.session_config()?,
        api,
        ephemeral,
        Arc::new(SystemCrypto),
    )?;
    Ok(Arc::new(session))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config;
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    info!(
        api = %config.api.base_url,
        issuer = %config.identity.issuer,
        state_dir = %config.app.state_dir.display(),
        "configuration loaded"
    );

    let session = build_session(&config)?;

    match cli.command {
        Command::Login { code, state } => {
            let returned = code.zip(state);
            login(&session, &config, returned).await
        }
        Command::Whoami => whoami(session).await,
        Command::Logout => {
            println!("{}", session.logout());
            Ok(())
        }
        Command::Status => {
            println!("{}", status_report(session.state()));
            Ok(())
        }
    }
}

/// Local view of the session. The profile, and with it the admin role, is
/// only known after `whoami` fetches it, so it is not reported here.
fn status_report(state: &SessionState) -> Value {
    json!({
        "authenticated": state.is_authenticated(),
        "has_refresh_token": state.refresh_token().is_some(),
    })
}

async fn login(
    session: &AuthSession,
    config: &Config,
    returned: Option<(String, String)>,
) -> Result<()> {
    let (code, state) = match returned {
        Some(params) => params,
        None => {
            let redirect = session.start_login()?;
            eprintln!("Open this URL in a browser to log in:");
            println!("{redirect}");

            if callback::listen_addr(&config.identity.redirect_uri).is_none() {
                eprintln!(
                    "Then run: control-login login --code <code> --state <state> \
                     with the values from {}",
                    config.identity.redirect_uri
                );
                return Ok(());
            }
            let timeout = Duration::from_secs(config.app.callback_timeout_secs);
            let params =
                callback::wait_for_callback(&config.identity.redirect_uri, timeout).await?;
            (params.code, params.state)
        }
    };

    session.verify_state(&state)?;
    match session.handle_callback(&code).await {
        Ok(Some(redirect)) => anyhow::bail!("credential rejected after login, visit {redirect}"),
        Ok(None) => {
            print_profile(session)?;
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context("login failed")),
    }
}

async fn whoami(session: Arc<AuthSession>) -> Result<()> {
    if !session.is_authenticated() {
        anyhow::bail!("not logged in, run: control-login login");
    }
    let redirect = spawn_init(session.clone())
        .await
        .context("session initialization task failed")?;
    match redirect {
        Some(Redirect::EndSession(url)) => {
            anyhow::bail!("session expired, end the provider session at {url}")
        }
        Some(other) => anyhow::bail!("session expired, visit {other}"),
        None => print_profile(&session),
    }
}

fn print_profile(session: &AuthSession) -> Result<()> {
    let user = session
        .user()
        .context("profile could not be loaded, try again later")?;
    println!("{}", serde_json::to_string_pretty(&user)?);
    Ok(())
}
