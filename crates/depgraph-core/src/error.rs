//! Error types for summary handling.

use thiserror::Error;

/// Errors raised while reading or validating a symbol summary.
#[derive(Error, Debug)]
pub enum SummaryError {
    /// A file entry is missing a required field or does not have the
    /// expected shape. Only the affected file is dropped from the build.
    #[error("malformed summary for {file}: {reason}")]
    Malformed { file: String, reason: String },

    /// An import given in statement form could not be understood.
    #[error("unrecognized import statement `{0}`")]
    ImportStatement(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SummaryError {
    /// Shorthand for a [`SummaryError::Malformed`].
    pub fn malformed(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SummaryError>;
