// result.rs — Suite run results and the aggregated run report.

use std::collections::HashSet;
use std::fmt;

use aspect_policy::ResourcePolicyExecution;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A resource that did not pass a policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedResource {
    pub policy: String,
    pub provider: String,
    pub region: String,
    pub kind: String,
    pub id: String,
    /// `failed`, or `error` with the fault that stopped evaluation.
    pub execution: ResourcePolicyExecution,
    /// The statement that failed or faulted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_statement: Option<String>,
}

/// Why a policy file could not be applied in one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunError {
    /// The policy source could not be loaded.
    Source { message: String },
    /// The policy did not compile; one rendered line per diagnostic.
    Compile { diagnostics: Vec<String> },
    /// Discovery of the policy's resource kind failed.
    Discovery { resource: String, message: String },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Source { message } => write!(f, "{}", message),
            RunError::Compile { diagnostics } => {
                write!(f, "compilation failed: {}", diagnostics.join("; "))
            }
            RunError::Discovery { resource, message } => {
                write!(f, "discovery of {} failed: {}", resource, message)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Error {
        error: RunError,
    },
    Evaluated {
        resources_evaluated: usize,
        failed_resources: Vec<FailedResource>,
    },
}

/// The outcome of one (element, region, policy file) triple.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicySuiteRunResult {
    pub element: String,
    pub provider: String,
    pub region: String,
    pub policy: String,
    pub outcome: RunOutcome,
}

impl PolicySuiteRunResult {
    pub fn error(&self) -> Option<&RunError> {
        match &self.outcome {
            RunOutcome::Error { error } => Some(error),
            RunOutcome::Evaluated { .. } => None,
        }
    }

    pub fn failed_resources(&self) -> &[FailedResource] {
        match &self.outcome {
            RunOutcome::Evaluated {
                failed_resources, ..
            } => failed_resources,
            RunOutcome::Error { .. } => &[],
        }
    }

    /// `element / region / policy: message` for reports.
    pub fn render_error(&self) -> Option<String> {
        self.error().map(|error| {
            format!(
                "{} / {} / {}: {}",
                self.element, self.region, self.policy, error
            )
        })
    }
}

/// Drop FailedResource entries whose (policy, kind, id) was already seen,
/// keeping the first occurrence.
pub fn dedup_failed_resources(results: &mut [PolicySuiteRunResult]) {
    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    for result in results.iter_mut() {
        if let RunOutcome::Evaluated {
            failed_resources, ..
        } = &mut result.outcome
        {
            failed_resources
                .retain(|f| seen.insert((f.policy.clone(), f.kind.clone(), f.id.clone())));
        }
    }
}

/// Exit classification of a run. Errors outrank failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Clean,
    Failures,
    Errors,
}

impl RunStatus {
    /// Process exit code: 0 clean, 2 errors, 3 failed resources only.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunStatus::Clean => 0,
            RunStatus::Errors => 2,
            RunStatus::Failures => 3,
        }
    }
}

/// Aggregated view of a run, as printed by `aspect run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub suite: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cancelled: bool,
    pub status: RunStatus,
    pub results: usize,
    pub errors: Vec<String>,
    pub failed_resources: Vec<FailedResource>,
}

impl RunReport {
    pub fn new(
        suite: impl Into<String>,
        started_at: DateTime<Utc>,
        results: &[PolicySuiteRunResult],
        cancelled: bool,
    ) -> Self {
        let errors: Vec<String> = results
            .iter()
            .filter_map(PolicySuiteRunResult::render_error)
            .collect();
        let failed_resources: Vec<FailedResource> = results
            .iter()
            .flat_map(|r| r.failed_resources().iter().cloned())
            .collect();

        let status = if !errors.is_empty() {
            RunStatus::Errors
        } else if !failed_resources.is_empty() {
            RunStatus::Failures
        } else {
            RunStatus::Clean
        };

        Self {
            run_id: Uuid::new_v4(),
            suite: suite.into(),
            started_at,
            finished_at: Utc::now(),
            cancelled,
            status,
            results: results.len(),
            errors,
            failed_resources,
        }
    }
}
