// suite.rs — Policy suite model.
//
// A suite is a named list of elements; each element pairs one cloud provider
// with the regions to scan and the policy files to run there. The document
// format keeps the element list under `policies` for compatibility with
// existing suite files.

use serde::{Deserialize, Serialize};

/// Extension of a single-policy source file.
pub const POLICY_EXTENSION: &str = "policy";
/// Extension of a policy suite document.
pub const SUITE_EXTENSION: &str = "suite";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicySuite {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// The suite's elements.
    #[serde(default)]
    pub policies: Vec<PolicyElement>,
}

/// One provider/regions/policy-files grouping within a suite.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyElement {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Provider name, e.g. `AWS`. Matched case-insensitively.
    #[serde(rename = "type")]
    pub provider: String,
    #[serde(default)]
    pub regions: Vec<String>,
    /// Policy file paths or `builtin/...` names.
    #[serde(default)]
    pub policies: Vec<String>,
}

impl PolicySuite {
    /// Wrap a single policy source in a suite with one element per provider,
    /// each scanning that provider's default regions.
    pub fn for_policy<'a>(
        policy: &str,
        providers: impl IntoIterator<Item = (&'a str, Vec<String>)>,
    ) -> Self {
        Self {
            name: format!("Policy: {}", policy),
            description: String::new(),
            policies: providers
                .into_iter()
                .map(|(provider, regions)| PolicyElement {
                    name: provider.to_string(),
                    description: String::new(),
                    provider: provider.to_string(),
                    regions,
                    policies: vec![policy.to_string()],
                })
                .collect(),
        }
    }

    /// Starter document written by `aspect init --suite`.
    pub fn template() -> Self {
        Self {
            name: "My Best Practices".to_string(),
            description: "Describe what the policy suite checks".to_string(),
            policies: vec![PolicyElement {
                name: "AWS Best Practices".to_string(),
                description: "Describe this section".to_string(),
                provider: "AWS".to_string(),
                regions: vec!["eu-west-1".to_string()],
                policies: vec![
                    "policies/MyPolicy.policy".to_string(),
                    "builtin/aws/s3-no-public-buckets.policy".to_string(),
                ],
            }],
        }
    }

    /// Number of (element, region) work units a run will schedule.
    pub fn unit_count(&self) -> usize {
        self.policies.iter().map(|e| e.regions.len()).sum()
    }
}

/// True if `path` ends with `.<extension>`, ignoring case.
pub fn has_extension(path: &str, extension: &str) -> bool {
    std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}
