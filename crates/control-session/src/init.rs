//! Background session initialization
//!
//! A restored token is only known to be *possessed*, not valid. Right after
//! construction the profile is fetched in the background; a rejected
//! credential logs the session out. The returned handle is the completion
//! signal: it resolves to the redirect the caller must perform, if any.

use std::sync::Arc;

use control_auth::Redirect;
use tokio::task::JoinHandle;
use tracing::info;

use crate::session::AuthSession;

/// Spawn the startup profile fetch.
pub fn spawn_init(session: Arc<AuthSession>) -> JoinHandle<Option<Redirect>> {
    tokio::spawn(async move {
        let redirect = session.initialize().await;
        info!(
            authenticated = session.is_authenticated(),
            profile_loaded = session.user().is_some(),
            "session initialized"
        );
        redirect
    })
}
