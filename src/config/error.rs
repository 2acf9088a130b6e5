//! Errors raised while loading or saving `serial-connection.toml`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    /// The config file or its directory could not be written.
    #[error("cannot write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value that parsed but is unusable, e.g. `serial.baud_rate = 0`.
    #[error("invalid `{key}`: {message}")]
    Invalid { key: &'static str, message: String },

    /// A `SERIAL_CONNECTION_*` override that does not parse.
    #[error("invalid {var}={value:?}: expected {expected}")]
    Env {
        var: String,
        value: String,
        expected: &'static str,
    },

    /// `save` on a loader that was not loaded from a file.
    #[error("no config file to save to")]
    NoFile,
}

impl ConfigError {
    pub fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }

    pub fn env(var: impl Into<String>, value: impl Into<String>, expected: &'static str) -> Self {
        Self::Env {
            var: var.into(),
            value: value.into(),
            expected,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
