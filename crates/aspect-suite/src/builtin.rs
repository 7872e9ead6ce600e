// builtin.rs — Policies and suites compiled into the binary.
//
// Built-ins are addressed as `builtin/<path>`. Lookup ignores case and
// accepts `\` as a separator, so `BUILTIN\aws-baseline.suite` works too.

use aspect_policy::CompilationUnit;

use crate::error::{Result, SuiteError};
use crate::serializer::PolicySuiteSerializer;
use crate::suite::PolicySuite;

const PREFIX: &str = "builtin/";

struct BuiltIn {
    name: &'static str,
    source: &'static str,
}

const POLICIES: &[BuiltIn] = &[
    BuiltIn {
        name: "builtin/aws/s3-no-public-buckets.policy",
        source: include_str!("../builtin/aws/s3-no-public-buckets.policy"),
    },
    BuiltIn {
        name: "builtin/aws/s3-versioning-enabled.policy",
        source: include_str!("../builtin/aws/s3-versioning-enabled.policy"),
    },
    BuiltIn {
        name: "builtin/aws/sg-no-world-ingress.policy",
        source: include_str!("../builtin/aws/sg-no-world-ingress.policy"),
    },
    BuiltIn {
        name: "builtin/aws/route-table-tagged.policy",
        source: include_str!("../builtin/aws/route-table-tagged.policy"),
    },
];

const SUITES: &[BuiltIn] = &[BuiltIn {
    name: "builtin/aws-baseline.suite",
    source: include_str!("../builtin/aws-baseline.suite"),
}];

/// Serves the embedded policies and suites by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltInPolicyProvider;

impl BuiltInPolicyProvider {
    pub fn new() -> Self {
        Self
    }

    /// True if `name` uses the `builtin/` (or `builtin\`) prefix.
    pub fn is_builtin(name: &str) -> bool {
        normalize(name).starts_with(PREFIX)
    }

    pub fn has_policy(&self, name: &str) -> bool {
        find(POLICIES, name).is_some()
    }

    /// The embedded policy as a compilation unit named by its canonical name.
    pub fn policy(&self, name: &str) -> Result<CompilationUnit> {
        find(POLICIES, name)
            .map(|b| CompilationUnit::from_source(b.name, b.source))
            .ok_or_else(|| SuiteError::UnknownBuiltin {
                what: "policy",
                name: name.to_string(),
            })
    }

    pub fn suite(&self, name: &str) -> Result<PolicySuite> {
        let builtin = find(SUITES, name).ok_or_else(|| SuiteError::UnknownBuiltin {
            what: "policy suite",
            name: name.to_string(),
        })?;
        PolicySuiteSerializer.deserialize(builtin.name, builtin.source)
    }

    pub fn policy_names(&self) -> impl Iterator<Item = &'static str> {
        POLICIES.iter().map(|b| b.name)
    }

    pub fn suite_names(&self) -> impl Iterator<Item = &'static str> {
        SUITES.iter().map(|b| b.name)
    }
}

fn normalize(name: &str) -> String {
    name.trim().replace('\\', "/").to_ascii_lowercase()
}

fn find(table: &'static [BuiltIn], name: &str) -> Option<&'static BuiltIn> {
    let wanted = normalize(name);
    table.iter().find(|b| b.name == wanted)
}
