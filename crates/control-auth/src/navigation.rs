//! Full-navigation outcomes
//!
//! The core never navigates. Operations that would leave the application
//! return a `Redirect` and the calling layer performs it; nothing in the
//! current flow should be relied on after that.

use std::fmt;

use url::Url;

use crate::constants::{DASHBOARD_PATH, LOGIN_PATH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// Identity provider authorize endpoint (start of login)
    Authorize(Url),
    /// Identity provider end-session endpoint (logout)
    EndSession(Url),
    /// In-app login page (credential rejected)
    Login,
    /// In-app landing page
    Dashboard,
}

impl Redirect {
    /// Absolute URL for provider redirects, in-app path otherwise.
    pub fn target(&self) -> &str {
        match self {
            Redirect::Authorize(url) | Redirect::EndSession(url) => url.as_str(),
            Redirect::Login => LOGIN_PATH,
            Redirect::Dashboard => DASHBOARD_PATH,
        }
    }

    /// Whether the redirect leaves the application for the identity provider.
    pub fn is_external(&self) -> bool {
        matches!(self, Redirect::Authorize(_) | Redirect::EndSession(_))
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target())
    }
}
