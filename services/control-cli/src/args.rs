//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file name, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "control-login.toml";

#[derive(Parser, Debug)]
#[command(name = "control-login")]
#[command(about = "Log in to the control plane with OAuth2 Authorization Code + PKCE")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, env = "CONFIG_PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start a login, or finish a pending one with --code and --state
    Login {
        /// Authorization code from the provider redirect
        #[arg(long, requires = "state")]
        code: Option<String>,

        /// `state` value from the same redirect
        #[arg(long, requires = "code")]
        state: Option<String>,
    },

    /// Load and print the current user's profile
    Whoami,

    /// End the session and print the provider's end-session URL
    Logout,

    /// Print local session status without contacting the backend
    Status,
}
