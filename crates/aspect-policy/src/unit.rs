// unit.rs — Compilation units: a policy's source text and the name used in diagnostics.

use std::fs;
use std::path::Path;

use crate::error::PolicyError;

/// Source text handed to the compiler, plus the name diagnostics refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    name: String,
    source: String,
}

impl CompilationUnit {
    /// Wrap inline source text.
    pub fn from_source(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Load a policy file. The unit is named after the path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            name: path.display().to_string(),
            source,
        })
    }

    /// Build a policy from an ad-hoc query such as
    /// `input.A == 1 && input.B != "x"`.
    ///
    /// The query becomes the body of the validate block unchanged; `&&` is
    /// already statement-level AND in the grammar, so parentheses and string
    /// literals containing `&&` keep their meaning.
    pub fn from_statements(resource: &str, statements: &str) -> Self {
        let source = format!(
            "resource \"{}\"\nvalidate {{\n    {}\n}}\n",
            escape(resource),
            statements.trim()
        );
        Self::from_source("<inspect>", source)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Quote-safe form of `text` for use inside a string literal.
fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
