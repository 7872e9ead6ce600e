// error.rs — Error types for the policy subsystem.
//
// Compile problems are not errors in this sense: they are reported as
// diagnostics on a CompilationContext. These variants cover the plumbing
// around the compiler (loading sources, catalog lookups).

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or resolving policies.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A policy source file could not be read.
    #[error("failed to read policy source {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No catalog entry exists for the requested resource kind.
    #[error("unknown resource type '{kind}'")]
    UnknownResource { kind: String },
}
