//! Authenticated user profile

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::constants::ADMIN_GROUPS;

/// Profile returned by the backend for the current bearer token.
///
/// Replaced wholesale on every successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    /// Subject identifier at the identity provider
    #[serde(rename = "authentik_uid")]
    pub external_id: String,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    #[serde(rename = "is_banned", default)]
    pub banned: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Member of any group in `ADMIN_GROUPS`.
    pub fn is_admin(&self) -> bool {
        ADMIN_GROUPS.iter().any(|group| self.groups.contains(*group))
    }
}
