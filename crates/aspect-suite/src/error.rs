// error.rs — Error types for suite loading, built-ins and configuration.
//
// Run-time problems (compile errors, discovery faults, evaluation faults) are
// not errors here: the runner reports them as data on each result.

use std::path::PathBuf;

use aspect_policy::PolicyError;
use thiserror::Error;

/// Errors raised before a suite run starts.
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid policy suite document {origin}: {source}")]
    Parse {
        origin: String,
        source: serde_yaml::Error,
    },

    #[error("failed to serialize policy suite: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("no built-in {what} named '{name}'")]
    UnknownBuiltin { what: &'static str, name: String },

    #[error("'{path}' is not a policy source; expected a .suite or .policy file")]
    UnsupportedSource { path: String },

    #[error("invalid configuration {path}: {source}")]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

pub type Result<T> = std::result::Result<T, SuiteError>;
