//! Auth session orchestrator
//!
//! Owns the login lifecycle on top of the shared `SessionState`:
//! `start_login` → (navigation) → `handle_callback` → `fetch_profile`, and
//! `logout`. Every operation that leaves the application returns a
//! `Redirect`; performing it is the caller's job.
//!
//! The PKCE verifier is single-use: `handle_callback` deletes it from
//! short-lived storage before the exchange request is dispatched, so a retry
//! after a failed exchange fails locally with `MissingVerifier`.

use std::sync::{Arc, Mutex, PoisonError};

use control_api::ApiClient;
use control_auth::constants::{OAUTH_STATE_KEY, PKCE_VERIFIER_KEY, PROFILE_PATH};
use control_auth::{
    Crypto, IdentityProvider, Redirect, SessionState, Storage, User, build_authorization_url,
    build_end_session_url, derive_challenge, generate_state, generate_verifier,
};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::guard::{self, GuardDecision, RouteMeta};

/// Message recorded when a failed login carries no message of its own
const LOGIN_FAILED: &str = "Login failed";

/// Static session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub identity: IdentityProvider,
    /// Absolute URL of the in-app login page; the provider returns here after logout
    pub login_url: Url,
}

/// Presentation state of the last login attempt.
#[derive(Debug, Default)]
struct Progress {
    loading: bool,
    error: String,
}

/// Clears `loading` when dropped, on every exit path of `handle_callback`.
struct LoadingGuard<'a> {
    progress: &'a Mutex<Progress>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        lock(self.progress).loading = false;
    }
}

pub struct AuthSession {
    identity: IdentityProvider,
    end_session: Url,
    state: Arc<SessionState>,
    ephemeral: Arc<dyn Storage>,
    crypto: Arc<dyn Crypto>,
    api: ApiClient,
    progress: Mutex<Progress>,
}

impl AuthSession {
    /// Build the session around `api`'s shared `SessionState`.
    ///
    /// `ephemeral` is the short-lived storage holding the in-flight PKCE
    /// context. No network call happens here; see `initialize`.
    pub fn new(
        config: SessionConfig,
        api: ApiClient,
        ephemeral: Arc<dyn Storage>,
        crypto: Arc<dyn Crypto>,
    ) -> Result<Self> {
        let end_session = build_end_session_url(&config.identity, &config.login_url)?;
        Ok(Self {
            identity: config.identity,
            end_session,
            state: api.session().clone(),
            ephemeral,
            crypto,
            api,
            progress: Mutex::new(Progress::default()),
        })
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.state.is_admin()
    }

    pub fn user(&self) -> Option<User> {
        self.state.user()
    }

    /// Whether a callback is being processed.
    pub fn loading(&self) -> bool {
        lock(&self.progress).loading
    }

    /// Message of the last failed callback, empty if none.
    pub fn error(&self) -> String {
        lock(&self.progress).error.clone()
    }

    /// Route guard decision for `route` against the current in-memory state.
    pub fn guard(&self, route: &RouteMeta) -> GuardDecision {
        guard::check(&self.state, route)
    }

    /// Begin a login attempt.
    ///
    /// Generates a fresh verifier, challenge and `state`, overwriting any
    /// previous attempt's context in short-lived storage, and returns the
    /// authorize redirect. The attempt continues in `handle_callback`.
    #[instrument(skip_all)]
    pub fn start_login(&self) -> Result<Redirect> {
        let crypto = self.crypto.as_ref();
        let verifier = generate_verifier(crypto);
        let challenge = derive_challenge(crypto, &verifier);
        let state = generate_state(crypto);

        self.ephemeral.set(PKCE_VERIFIER_KEY, &verifier)?;
        self.ephemeral.set(OAUTH_STATE_KEY, &state)?;

        let url = build_authorization_url(&self.identity, &challenge, &state)?;
        info!(
            client_id = %self.identity.client_id,
            "login started, redirecting to identity provider"
        );
        Ok(Redirect::Authorize(url))
    }

    /// Check the callback's `state` against the pending login.
    ///
    /// The stored value is deleted by this call whether or not it matches.
    pub fn verify_state(&self, returned: &str) -> Result<()> {
        match self.ephemeral.take(OAUTH_STATE_KEY)? {
            Some(expected) if expected == returned => Ok(()),
            Some(_) => {
                warn!("callback state does not match pending login");
                Err(Error::StateMismatch)
            }
            None => {
                warn!("callback received without a pending login state");
                Err(Error::StateMismatch)
            }
        }
    }

    /// Complete a login with the authorization `code` from the callback.
    ///
    /// Consumes the stored verifier, exchanges the code, persists the tokens
    /// and loads the profile. On failure the message is recorded in `error()`
    /// and the error is returned. `loading()` is true for the duration.
    ///
    /// Returns `Some(redirect)` only if the profile fetch found the new
    /// credential rejected and logged out.
    #[instrument(skip_all)]
    pub async fn handle_callback(&self, code: &str) -> Result<Option<Redirect>> {
        let _loading = self.begin_loading();

        match self.complete_login(code).await {
            Ok(redirect) => Ok(redirect),
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "login failed");
                lock(&self.progress).error = if message.is_empty() {
                    LOGIN_FAILED.to_string()
                } else {
                    message
                };
                Err(e)
            }
        }
    }

    async fn complete_login(&self, code: &str) -> Result<Option<Redirect>> {
        let verifier = self
            .ephemeral
            .take(PKCE_VERIFIER_KEY)?
            .filter(|v| !v.is_empty())
            .ok_or(Error::MissingVerifier)?;

        let tokens = self
            .api
            .exchange_code(code, self.identity.redirect_uri.as_str(), &verifier)
            .await?;
        self.state.store_tokens(&tokens)?;
        info!(
            has_refresh_token = tokens.refresh_token.is_some(),
            "code exchanged, session established"
        );

        Ok(self.fetch_profile().await)
    }

    /// Load the current user's profile.
    ///
    /// A rejected credential logs out and returns the end-session redirect.
    /// Any other failure leaves the previous profile in place and is not
    /// surfaced.
    #[instrument(skip_all)]
    pub async fn fetch_profile(&self) -> Option<Redirect> {
        match self.api.get::<User>(PROFILE_PATH).await {
            Ok(user) => {
                info!(user_id = %user.id, admin = user.is_admin(), "profile loaded");
                self.state.set_user(user);
                None
            }
            Err(e) if e.is_unauthorized() => {
                info!("profile request rejected, logging out");
                Some(self.logout())
            }
            Err(e) => {
                warn!(error = %e, "profile fetch failed, keeping previous profile");
                None
            }
        }
    }

    /// Destroy the session and return the provider's end-session redirect.
    ///
    /// Nothing in the current flow should run after the redirect is performed.
    pub fn logout(&self) -> Redirect {
        self.state.teardown();
        info!("logged out");
        Redirect::EndSession(self.end_session.clone())
    }

    /// Startup step: refresh the profile if a token was restored.
    ///
    /// Its only possible effect besides loading the profile is the logout
    /// triggered by a rejected credential.
    pub async fn initialize(&self) -> Option<Redirect> {
        if !self.state.is_authenticated() {
            debug!("no stored credential, skipping profile fetch");
            return None;
        }
        self.fetch_profile().await
    }

    fn begin_loading(&self) -> LoadingGuard<'_> {
        let mut progress = lock(&self.progress);
        progress.loading = true;
        progress.error.clear();
        LoadingGuard {
            progress: &self.progress,
        }
    }
}

fn lock(progress: &Mutex<Progress>) -> std::sync::MutexGuard<'_, Progress> {
    progress.lock().unwrap_or_else(PoisonError::into_inner)
}
