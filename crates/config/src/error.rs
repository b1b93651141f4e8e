use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or validating job configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required property is absent or blank.
    #[error("missing required configuration: {0}")]
    MissingRequired(&'static str),

    /// A property is present but cannot be used.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// A properties file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
