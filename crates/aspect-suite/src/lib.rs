//! # aspect-suite
//!
//! Policy suites for Aspect: the suite document model, validation, built-in
//! policies, the cloud provider contract, and the concurrent
//! [`PolicySuiteRunner`].
//!
//! A suite groups policy files by provider and region. Running one compiles
//! each policy against its provider's property catalog, discovers the
//! resources it targets, and evaluates them, producing one
//! [`PolicySuiteRunResult`] per (element, region, policy file).
//!
//! ## Key invariants
//!
//! - **Validate before run**: a suite that fails [`PolicySuiteValidator`]
//!   must not be run at all.
//! - **Partial failure is data**: compile, source and discovery problems
//!   block only their own triple and are reported as [`RunError`]s.
//! - **One entry per (policy, resource)**: duplicate FailedResource entries
//!   are dropped when unit results are merged.
//! - **Cooperative cancellation**: no unit starts after the run's
//!   `CancellationToken` fires; results produced so far are returned.

pub mod builtin;
pub mod config;
pub mod error;
pub mod provider;
pub mod result;
pub mod runner;
pub mod serializer;
pub mod suite;
pub mod validator;

pub use builtin::BuiltInPolicyProvider;
pub use config::{AspectConfig, OutputFormat, DEFAULT_CONFIG_PATH};
pub use error::SuiteError;
pub use provider::{CloudProvider, DiscoveryError, ProgressFn, ProviderRegistry};
pub use result::{
    FailedResource, PolicySuiteRunResult, RunError, RunOutcome, RunReport, RunStatus,
};
pub use runner::{PolicySuiteRunner, DEFAULT_MAX_CONCURRENCY};
pub use serializer::PolicySuiteSerializer;
pub use suite::{PolicyElement, PolicySuite, POLICY_EXTENSION, SUITE_EXTENSION};
pub use validator::{PolicySuiteValidator, ValidationResult};
