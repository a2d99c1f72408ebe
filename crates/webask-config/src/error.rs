//! Errors raised while reading `webask.toml`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration at {0}")]
    NotFound(String),

    #[error("${{{0}}} is referenced but the variable is unset")]
    EnvVarNotSet(String),

    #[error("reading configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration: {0}")]
    TomlParse(#[from] toml::de::Error),
}
