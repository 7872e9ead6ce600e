// serializer.rs — Read and write policy suite documents.
//
// Suites are YAML. JSON documents load too, since JSON is a subset of YAML.
// When a suite is loaded from a file, relative policy paths are resolved
// against the suite file's directory so a suite runs the same from any
// working directory. Built-in names are left untouched.

use std::fs;
use std::path::Path;

use crate::builtin::BuiltInPolicyProvider;
use crate::error::{Result, SuiteError};
use crate::suite::PolicySuite;

#[derive(Debug, Clone, Copy, Default)]
pub struct PolicySuiteSerializer;

impl PolicySuiteSerializer {
    pub fn serialize(&self, suite: &PolicySuite) -> Result<String> {
        serde_yaml::to_string(suite).map_err(SuiteError::Serialize)
    }

    /// Parse a suite document. `origin` names the document in errors.
    pub fn deserialize(&self, origin: &str, text: &str) -> Result<PolicySuite> {
        serde_yaml::from_str(text).map_err(|source| SuiteError::Parse {
            origin: origin.to_string(),
            source,
        })
    }

    /// Load a suite file, resolving relative policy paths.
    pub fn load(&self, path: &Path) -> Result<PolicySuite> {
        let text = fs::read_to_string(path).map_err(|source| SuiteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut suite = self.deserialize(&path.display().to_string(), &text)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for element in &mut suite.policies {
            for policy in &mut element.policies {
                if BuiltInPolicyProvider::is_builtin(policy) || Path::new(policy).is_absolute() {
                    continue;
                }
                *policy = base.join(policy.as_str()).display().to_string();
            }
        }

        tracing::debug!(
            path = %path.display(),
            elements = suite.policies.len(),
            "loaded policy suite"
        );
        Ok(suite)
    }
}
