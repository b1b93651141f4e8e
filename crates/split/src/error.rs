use std::io;
use thiserror::Error;

/// Errors raised while building, encoding or decoding a split.
#[derive(Debug, Error)]
pub enum SplitError {
    /// The bytes do not describe a valid split. Nothing is guessed.
    #[error("malformed split: {reason}")]
    MalformedSplit { reason: String },

    /// Writing or reading the underlying stream failed.
    #[error("split io error: {0}")]
    Io(#[from] io::Error),
}

pub(crate) fn malformed(reason: impl Into<String>) -> SplitError {
    SplitError::MalformedSplit {
        reason: reason.into(),
    }
}
