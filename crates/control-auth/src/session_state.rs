//! Shared session state
//!
//! One `SessionState` exists per application instance. It is restored from
//! durable storage at construction and shared (via `Arc`) by the API
//! transport and the session orchestrator, so either can tear it down.
//!
//! Authentication means *possession* of an access token, not its validity.
//! A token that the backend no longer accepts is only discovered when a
//! request is rejected.

use std::sync::{Arc, PoisonError, RwLock};

use common::Secret;
use tracing::{debug, info, warn};

use crate::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::error::Result;
use crate::storage::Storage;
use crate::token::TokenResponse;
use crate::user::User;

#[derive(Default)]
struct Inner {
    access_token: Option<Secret<String>>,
    refresh_token: Option<Secret<String>>,
    /// Memory only, never persisted
    user: Option<User>,
}

pub struct SessionState {
    durable: Arc<dyn Storage>,
    inner: RwLock<Inner>,
}

impl SessionState {
    /// Restore tokens from durable storage. The user profile starts empty.
    pub fn restore(durable: Arc<dyn Storage>) -> Self {
        let access_token = durable.get(ACCESS_TOKEN_KEY).and_then(Secret::non_empty);
        let refresh_token = durable.get(REFRESH_TOKEN_KEY).and_then(Secret::non_empty);
        info!(
            has_access_token = access_token.is_some(),
            has_refresh_token = refresh_token.is_some(),
            "session restored"
        );
        Self {
            durable,
            inner: RwLock::new(Inner {
                access_token,
                refresh_token,
                user: None,
            }),
        }
    }

    /// In-memory access token.
    pub fn access_token(&self) -> Option<String> {
        self.read(|inner| inner.access_token.as_ref().map(|t| t.expose().clone()))
    }

    /// Access token as currently held in durable storage.
    ///
    /// May differ from the in-memory copy when another client instance wrote
    /// the same storage.
    pub fn durable_access_token(&self) -> Option<String> {
        self.durable
            .get(ACCESS_TOKEN_KEY)
            .filter(|token| !token.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(|inner| inner.refresh_token.as_ref().map(|t| t.expose().clone()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|inner| inner.access_token.is_some())
    }

    /// Whether the loaded profile belongs to an admin group. False without a profile.
    pub fn is_admin(&self) -> bool {
        self.read(|inner| inner.user.as_ref().is_some_and(User::is_admin))
    }

    pub fn user(&self) -> Option<User> {
        self.read(|inner| inner.user.clone())
    }

    /// Absorb the token fields of a successful exchange.
    ///
    /// The access token is always written; the refresh token only when the
    /// response carries one. Both keys go to durable storage in one write,
    /// before memory, so a failed write leaves the session as it was.
    pub fn store_tokens(&self, tokens: &TokenResponse) -> Result<()> {
        let refresh = tokens.refresh_token.as_deref().filter(|t| !t.is_empty());
        let mut entries = vec![(ACCESS_TOKEN_KEY, tokens.access_token.as_str())];
        if let Some(refresh) = refresh {
            entries.push((REFRESH_TOKEN_KEY, refresh));
        }
        self.durable.set_many(&entries)?;

        let mut inner = self.write();
        inner.access_token = Secret::non_empty(tokens.access_token.clone());
        if let Some(refresh) = refresh {
            inner.refresh_token = Some(Secret::new(refresh.to_string()));
        }
        debug!(has_refresh_token = refresh.is_some(), "tokens stored");
        Ok(())
    }

    /// Replace the profile wholesale.
    pub fn set_user(&self, user: User) {
        self.write().user = Some(user);
    }

    /// Destroy the session: clear memory, then remove the durable keys.
    ///
    /// Memory is cleared first, so the session is unauthenticated even when
    /// durable removal fails; such failures are logged.
    pub fn teardown(&self) {
        *self.write() = Inner::default();

        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.durable.remove(key) {
                warn!(key, error = %e, "failed to clear durable session key");
            }
        }
        info!("session torn down");
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> T {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
