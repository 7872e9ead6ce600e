// runner.rs — Concurrent policy suite runner.
//
// A run fans out over (element, region) units on a JoinSet, at most
// `max_concurrency` at a time. Each unit:
//
// 1. Waits for a worker permit; if the run is cancelled meanwhile it
//    produces nothing
// 2. Loads and compiles every policy file against the provider's catalog
//    (a load/compile failure → one Error result for that policy)
// 3. Discovers each distinct resource kind the compiled policies need,
//    once per region (a discovery failure → Error results for every policy
//    of that kind; other kinds carry on)
// 4. Applies each policy to every discovered resource; Failed/Error
//    outcomes become FailedResource entries
//
// Units build their results locally and hand them back at the join, where
// they are ordered by unit and de-duplicated. Cancellation is checked before
// each unit starts, before each policy is loaded, between discovery calls
// and between evaluations; whatever was produced up to that point is
// returned.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use aspect_policy::{
    CompilationUnit, CompiledPolicy, PolicyCompiler, PolicyError, Resource,
    ResourcePolicyExecution,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::builtin::BuiltInPolicyProvider;
use crate::provider::{CloudProvider, DiscoveryError, ProgressFn, ProviderRegistry};
use crate::result::{dedup_failed_resources, FailedResource, PolicySuiteRunResult, RunError, RunOutcome};
use crate::suite::PolicySuite;

/// Default number of (element, region) units processed at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

pub struct PolicySuiteRunner {
    providers: Arc<ProviderRegistry>,
    builtins: BuiltInPolicyProvider,
    max_concurrency: usize,
    progress: Arc<ProgressFn>,
}

/// One (element, region) pair scheduled on the pool.
struct WorkUnit {
    index: usize,
    element: String,
    provider_name: String,
    provider: Option<Arc<dyn CloudProvider>>,
    region: String,
    policies: Vec<String>,
}

impl WorkUnit {
    fn result(&self, policy: &str, outcome: RunOutcome) -> PolicySuiteRunResult {
        PolicySuiteRunResult {
            element: self.element.clone(),
            provider: self.provider_name.clone(),
            region: self.region.clone(),
            policy: policy.to_string(),
            outcome,
        }
    }

    fn error(&self, policy: &str, error: RunError) -> PolicySuiteRunResult {
        self.result(policy, RunOutcome::Error { error })
    }
}

impl PolicySuiteRunner {
    pub fn new(providers: Arc<ProviderRegistry>) -> Self {
        Self {
            providers,
            builtins: BuiltInPolicyProvider::new(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            progress: Arc::new(|_: &str| {}),
        }
    }

    pub fn with_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_progress(mut self, progress: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.progress = Arc::new(progress);
        self
    }

    /// Run every (element, region, policy) of `suite`.
    ///
    /// Never fails: compile, source and discovery problems are reported on
    /// the returned results. The suite is expected to have passed validation.
    pub async fn run(&self, suite: &PolicySuite, cancel: CancellationToken) -> Vec<PolicySuiteRunResult> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        let mut index = 0;
        for element in &suite.policies {
            let provider = self.providers.get(&element.provider);
            for region in &element.regions {
                let unit = WorkUnit {
                    index,
                    element: element.name.clone(),
                    provider_name: provider
                        .as_ref()
                        .map(|p| p.name().to_string())
                        .unwrap_or_else(|| element.provider.clone()),
                    provider: provider.clone(),
                    region: region.clone(),
                    policies: element.policies.clone(),
                };
                index += 1;

                let semaphore = Arc::clone(&semaphore);
                let cancel = cancel.clone();
                let progress = Arc::clone(&self.progress);
                let builtins = self.builtins;
                tasks.spawn(async move {
                    let permit = tokio::select! {
                        _ = cancel.cancelled() => None,
                        permit = semaphore.acquire_owned() => permit.ok(),
                    };
                    let Some(_permit) = permit else {
                        return (unit.index, Vec::new());
                    };
                    if cancel.is_cancelled() {
                        return (unit.index, Vec::new());
                    }
                    let results = run_unit(&unit, builtins, progress.as_ref(), &cancel).await;
                    (unit.index, results)
                });
            }
        }

        tracing::info!(
            suite = %suite.name,
            units = index,
            max_concurrency = self.max_concurrency,
            "running policy suite"
        );

        let mut per_unit = Vec::with_capacity(index);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(unit_results) => per_unit.push(unit_results),
                Err(e) => tracing::error!(error = %e, "policy suite unit did not complete"),
            }
        }
        per_unit.sort_by_key(|(index, _)| *index);

        let mut results: Vec<PolicySuiteRunResult> =
            per_unit.into_iter().flat_map(|(_, results)| results).collect();
        dedup_failed_resources(&mut results);

        tracing::info!(
            suite = %suite.name,
            results = results.len(),
            cancelled = cancel.is_cancelled(),
            "policy suite finished"
        );
        results
    }
}

async fn run_unit(
    unit: &WorkUnit,
    builtins: BuiltInPolicyProvider,
    progress: &ProgressFn,
    cancel: &CancellationToken,
) -> Vec<PolicySuiteRunResult> {
    let mut results = Vec::new();

    let Some(provider) = &unit.provider else {
        for policy in &unit.policies {
            results.push(unit.error(
                policy,
                RunError::Source {
                    message: format!("unknown provider type '{}'", unit.provider_name),
                },
            ));
        }
        return results;
    };

    tracing::debug!(
        element = %unit.element,
        provider = %unit.provider_name,
        region = %unit.region,
        "starting unit"
    );

    // Compile everything first: the policies decide which kinds to discover.
    let compiler = PolicyCompiler::new();
    let mut compiled: Vec<(String, CompiledPolicy)> = Vec::new();
    for policy in &unit.policies {
        if cancel.is_cancelled() {
            return results;
        }
        let source = if BuiltInPolicyProvider::is_builtin(policy) {
            builtins.policy(policy).map_err(|e| e.to_string())
        } else {
            load_policy_file(policy).await
        };
        let source = match source {
            Ok(source) => source,
            Err(message) => {
                results.push(unit.error(policy, RunError::Source { message }));
                continue;
            }
        };

        let context = compiler.compile_with_catalog(source, provider.catalog());
        let diagnostics = context.render_diagnostics();
        match context.into_policy() {
            Some(compiled_policy) => {
                for warning in &diagnostics {
                    tracing::warn!(policy = %policy, "{}", warning);
                }
                compiled.push((policy.clone(), compiled_policy));
            }
            None => results.push(unit.error(policy, RunError::Compile { diagnostics })),
        }
    }

    // Discover each needed kind once for this region.
    let mut kinds: Vec<&str> = Vec::new();
    for (_, policy) in &compiled {
        if !kinds.contains(&policy.resource_kind()) {
            kinds.push(policy.resource_kind());
        }
    }

    let mut discovered: HashMap<&str, Result<Vec<Box<dyn Resource>>, String>> = HashMap::new();
    for kind in kinds {
        if cancel.is_cancelled() {
            return results;
        }
        match provider.discover(&unit.region, kind, progress, cancel).await {
            Ok(resources) => {
                tracing::debug!(
                    region = %unit.region,
                    kind,
                    count = resources.len(),
                    "discovered resources"
                );
                discovered.insert(kind, Ok(resources));
            }
            Err(DiscoveryError::Cancelled) => return results,
            Err(e) => {
                tracing::warn!(
                    provider = %unit.provider_name,
                    region = %unit.region,
                    kind,
                    error = %e,
                    "discovery failed"
                );
                discovered.insert(kind, Err(e.to_string()));
            }
        }
    }

    // Evaluate.
    for (policy_name, policy) in &compiled {
        if cancel.is_cancelled() {
            break;
        }
        let outcome = match discovered.get(policy.resource_kind()) {
            Some(Ok(resources)) => evaluate(unit, policy_name, policy, resources),
            Some(Err(message)) => RunOutcome::Error {
                error: RunError::Discovery {
                    resource: policy.resource_kind().to_string(),
                    message: message.clone(),
                },
            },
            None => continue,
        };
        results.push(unit.result(policy_name, outcome));
    }

    results
}

/// Read a policy file without blocking the worker thread.
async fn load_policy_file(path: &str) -> Result<CompilationUnit, String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(CompilationUnit::from_source(path, text)),
        Err(source) => Err(PolicyError::Io {
            path: PathBuf::from(path),
            source,
        }
        .to_string()),
    }
}

fn evaluate(
    unit: &WorkUnit,
    policy_name: &str,
    policy: &CompiledPolicy,
    resources: &[Box<dyn Resource>],
) -> RunOutcome {
    let failed_resources: Vec<FailedResource> = resources
        .iter()
        .filter_map(|resource| {
            let trace = policy.evaluate_with_trace(resource.as_ref());
            if trace.execution == ResourcePolicyExecution::Passed {
                return None;
            }
            Some(FailedResource {
                policy: policy_name.to_string(),
                provider: unit.provider_name.clone(),
                region: unit.region.clone(),
                kind: resource.kind().to_string(),
                id: resource.id().to_string(),
                failed_statement: trace.deciding_statement().map(str::to_string),
                execution: trace.execution,
            })
        })
        .collect();

    tracing::debug!(
        policy = %policy_name,
        region = %unit.region,
        evaluated = resources.len(),
        failed = failed_resources.len(),
        "evaluated policy"
    );
    RunOutcome::Evaluated {
        resources_evaluated: resources.len(),
        failed_resources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aspect_policy::{PropertyType, ResourceCatalog, ResourceDescriptor};
    use async_trait::async_trait;

    struct Empty(ResourceCatalog);

    #[async_trait]
    impl CloudProvider for Empty {
        fn name(&self) -> &str {
            "Test"
        }
        fn catalog(&self) -> &ResourceCatalog {
            &self.0
        }
        fn all_regions(&self) -> Vec<String> {
            vec!["r1".to_string()]
        }
        fn default_regions(&self) -> Vec<String> {
            self.all_regions()
        }
        fn is_valid_region(&self, _region: &str) -> bool {
            true
        }
        async fn discover(
            &self,
            _region: &str,
            _kind: &str,
            _progress: &ProgressFn,
            _cancel: &CancellationToken,
        ) -> Result<Vec<Box<dyn Resource>>, DiscoveryError> {
            Ok(Vec::new())
        }
    }

    fn unit(policies: &[&str]) -> WorkUnit {
        let catalog = ResourceCatalog::new().with(
            ResourceDescriptor::new("Bucket", "Test").property("Public", PropertyType::Boolean, ""),
        );
        WorkUnit {
            index: 0,
            element: "e".to_string(),
            provider_name: "Test".to_string(),
            provider: Some(Arc::new(Empty(catalog))),
            region: "r1".to_string(),
            policies: policies.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn unit_loads_nothing_once_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let results = run_unit(
            &unit(&["does-not-exist.policy"]),
            BuiltInPolicyProvider::new(),
            &|_: &str| {},
            &cancel,
        )
        .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn unreadable_policy_file_names_its_path() {
        let results = run_unit(
            &unit(&["does-not-exist.policy"]),
            BuiltInPolicyProvider::new(),
            &|_: &str| {},
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(results.len(), 1);
        match results[0].error() {
            Some(RunError::Source { message }) => {
                assert!(message.contains("does-not-exist.policy"), "{}", message)
            }
            other => panic!("expected a source error, got {:?}", other),
        }
    }
}
