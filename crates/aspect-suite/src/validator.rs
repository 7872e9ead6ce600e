// validator.rs — Structural checks on a policy suite before it runs.
//
// The validator never compiles policy bodies. It checks, for every element:
//
// 1. The suite has at least one element
// 2. The element's provider type is registered (case-insensitive)
// 3. The element lists at least one region and at least one policy
// 4. Every region is well-formed for the provider
// 5. Every policy file exists and is readable, or names a built-in policy
//
// All violations are collected; a suite with any violation must not run.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::builtin::BuiltInPolicyProvider;
use crate::provider::ProviderRegistry;
use crate::suite::PolicySuite;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

pub struct PolicySuiteValidator<'a> {
    providers: &'a ProviderRegistry,
    builtins: BuiltInPolicyProvider,
}

impl<'a> PolicySuiteValidator<'a> {
    pub fn new(providers: &'a ProviderRegistry) -> Self {
        Self {
            providers,
            builtins: BuiltInPolicyProvider::new(),
        }
    }

    pub fn validate(&self, suite: &PolicySuite) -> ValidationResult {
        let mut errors = Vec::new();

        if suite.policies.is_empty() {
            errors.push(format!("policy suite '{}' has no policy elements", suite.name));
        }

        for (index, element) in suite.policies.iter().enumerate() {
            let label = if element.name.trim().is_empty() {
                format!("element #{}", index + 1)
            } else {
                format!("element '{}'", element.name)
            };

            let provider = self.providers.get(&element.provider);
            if provider.is_none() {
                errors.push(format!(
                    "{}: unknown provider type '{}' (known: {})",
                    label,
                    element.provider,
                    self.providers.names().join(", ")
                ));
            }

            if element.regions.is_empty() {
                errors.push(format!("{}: no regions specified", label));
            }
            if let Some(provider) = &provider {
                for region in &element.regions {
                    if !provider.is_valid_region(region) {
                        errors.push(format!(
                            "{}: '{}' is not a valid {} region",
                            label,
                            region,
                            provider.name()
                        ));
                    }
                }
            }

            if element.policies.is_empty() {
                errors.push(format!("{}: no policies specified", label));
            }
            for policy in &element.policies {
                if let Some(problem) = self.check_policy_source(policy) {
                    errors.push(format!("{}: {}", label, problem));
                }
            }
        }

        let result = ValidationResult::from_errors(errors);
        tracing::debug!(
            suite = %suite.name,
            valid = result.is_valid,
            errors = result.errors.len(),
            "validated policy suite"
        );
        result
    }

    fn check_policy_source(&self, policy: &str) -> Option<String> {
        if BuiltInPolicyProvider::is_builtin(policy) {
            return (!self.builtins.has_policy(policy))
                .then(|| format!("no built-in policy named '{}'", policy));
        }
        let path = Path::new(policy);
        if !path.is_file() {
            return Some(format!("policy file '{}' does not exist", policy));
        }
        File::open(path)
            .err()
            .map(|e| format!("policy file '{}' is not readable: {}", policy, e))
    }
}
