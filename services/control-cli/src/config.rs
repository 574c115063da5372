//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Every value here identifies a public OAuth client; tokens never live in
//! the config file, only in the state directory.

use std::path::{Path, PathBuf};

use control_auth::IdentityProvider;
use control_auth::constants::LOGIN_PATH;
use control_session::SessionConfig;
use serde::Deserialize;
use url::Url;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub identity: IdentityConfig,
    pub api: ApiConfig,
    pub app: AppConfig,
}

/// Identity provider client registration
#[derive(Debug, Deserialize)]
pub struct IdentityConfig {
    pub issuer: Url,
    pub client_id: String,
    pub redirect_uri: Url,
}

/// Backend settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: Url,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Client application settings
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Absolute URL of the login page; defaults to `/login` on the backend origin
    #[serde(default)]
    pub login_url: Option<Url>,
    /// Directory holding durable session storage and the pending login context
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    /// How long `login` waits for the provider callback
    #[serde(default = "default_callback_timeout")]
    pub callback_timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

fn default_callback_timeout() -> u64 {
    300
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".control-login")
}

/// Environment overrides, applied after the file is parsed.
const ENV_API_URL: &str = "CONTROL_API_URL";
const ENV_ISSUER: &str = "CONTROL_ISSUER";
const ENV_CLIENT_ID: &str = "CONTROL_CLIENT_ID";
const ENV_REDIRECT_URI: &str = "CONTROL_REDIRECT_URI";

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(value) = std::env::var(ENV_API_URL) {
            config.api.base_url = parse_url("api.base_url", &value)?;
        }
        if let Ok(value) = std::env::var(ENV_ISSUER) {
            config.identity.issuer = parse_url("identity.issuer", &value)?;
        }
        if let Ok(value) = std::env::var(ENV_CLIENT_ID) {
            config.identity.client_id = value;
        }
        if let Ok(value) = std::env::var(ENV_REDIRECT_URI) {
            config.identity.redirect_uri = parse_url("identity.redirect_uri", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        require_http("api.base_url", &self.api.base_url)?;
        require_http("identity.issuer", &self.identity.issuer)?;
        require_http("identity.redirect_uri", &self.identity.redirect_uri)?;
        if let Some(login_url) = &self.app.login_url {
            require_http("app.login_url", login_url)?;
        }

        if self.identity.client_id.trim().is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.app.callback_timeout_secs == 0 {
            return Err(common::Error::Config(
                "callback_timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Login page the provider returns to after logout.
    pub fn login_url(&self) -> common::Result<Url> {
        match &self.app.login_url {
            Some(url) => Ok(url.clone()),
            None => self
                .api
                .base_url
                .join(LOGIN_PATH)
                .map_err(|e| common::Error::InvalidUrl {
                    field: "app.login_url",
                    reason: e.to_string(),
                }),
        }
    }

    pub fn session_config(&self) -> common::Result<SessionConfig> {
        Ok(SessionConfig {
            identity: IdentityProvider {
                issuer: self.identity.issuer.clone(),
                client_id: self.identity.client_id.clone(),
                redirect_uri: self.identity.redirect_uri.clone(),
            },
            login_url: self.login_url()?,
        })
    }
}

fn parse_url(field: &'static str, value: &str) -> common::Result<Url> {
    Url::parse(value).map_err(|e| common::Error::InvalidUrl {
        field,
        reason: e.to_string(),
    })
}

fn require_http(field: &'static str, url: &Url) -> common::Result<()> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(common::Error::InvalidUrl {
            field,
            reason: format!("scheme must be http or https, got {other}"),
        }),
    }
}
