// error.rs — Errors raised by the AWS provider.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AwsProviderError {
    #[error("failed to read inventory snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed inventory snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid region pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, AwsProviderError>;
