//! Configuration error types

use thiserror::Error;

/// Errors raised while loading or validating client configuration
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid {field} URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_say_what_failed() {
        let err = Error::Config("timeout_secs must be greater than 0".into());
        assert_eq!(
            err.to_string(),
            "invalid configuration: timeout_secs must be greater than 0"
        );

        let err = Error::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        assert_eq!(err.to_string(), "reading config file: no such file");
    }

    #[test]
    fn invalid_url_names_the_field() {
        let err = Error::InvalidUrl {
            field: "identity.issuer",
            reason: "relative URL without a base".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid identity.issuer URL: relative URL without a base"
        );
    }
}
