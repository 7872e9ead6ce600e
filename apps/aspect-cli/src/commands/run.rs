// run.rs — `aspect run`: validate, run, and report a policy source.
//
// Flow:
//   1. Resolve the source into a suite (`.suite` file, built-in suite, or a
//      single `.policy` wrapped in a one-element suite)
//   2. Validate; an invalid suite prints its violations and exits 1
//   3. Run with Ctrl-C wired to the run's cancellation token
//   4. Print the report (JSON or text) and exit with the run status code

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use aspect_policy::{CompilationUnit, PolicyCompiler, ResourcePolicyExecution};
use aspect_suite::suite::has_extension;
use aspect_suite::{
    BuiltInPolicyProvider, OutputFormat, PolicySuite, PolicySuiteRunner, PolicySuiteValidator,
    RunReport, POLICY_EXTENSION,
};
use tokio_util::sync::CancellationToken;

use super::{load_suite, Context};

pub fn execute(
    context: &Context,
    source: &str,
    format: Option<OutputFormat>,
    regions: &[String],
) -> anyhow::Result<ExitCode> {
    let suite = resolve(context, source, regions)?;

    let validation = PolicySuiteValidator::new(&context.providers).validate(&suite);
    if !validation.is_valid {
        eprintln!("{} is not a valid policy suite:", source);
        for error in &validation.errors {
            eprintln!("  - {}", error);
        }
        return Ok(ExitCode::from(1));
    }

    let runner = PolicySuiteRunner::new(Arc::clone(&context.providers))
        .with_concurrency(context.config.runner.max_concurrency)
        .with_progress(|message| tracing::info!("{}", message));

    let started_at = chrono::Utc::now();
    let cancel = CancellationToken::new();
    let results = context.runtime()?.block_on(async {
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted; cancelling run");
                on_interrupt.cancel();
            }
        });
        runner.run(&suite, cancel.clone()).await
    });
    let report = RunReport::new(&suite.name, started_at, &results, cancel.is_cancelled());

    match format.unwrap_or(context.config.output.format) {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize run report")?
        ),
        OutputFormat::Text => print_text(&report),
    }

    Ok(ExitCode::from(report.status.exit_code()))
}

/// Turn a run source into a suite.
fn resolve(context: &Context, source: &str, regions: &[String]) -> anyhow::Result<PolicySuite> {
    if !has_extension(source, POLICY_EXTENSION) {
        return load_suite(source);
    }

    let builtin = BuiltInPolicyProvider::is_builtin(source);
    if !builtin && !std::path::Path::new(source).is_file() {
        anyhow::bail!("policy file '{}' does not exist", source);
    }

    // Target only the provider that owns the policy's resource kind. When the
    // policy does not compile, fall back to every provider so the run
    // reports the diagnostics.
    let unit = if builtin {
        BuiltInPolicyProvider::new().policy(source)?
    } else {
        CompilationUnit::from_file(source)?
    };
    let catalog = context.providers.catalog();
    let owner = PolicyCompiler::new()
        .compile_with_catalog(unit, &catalog)
        .into_policy()
        .and_then(|policy| context.providers.provider_for_kind(policy.resource_kind()));
    let targets: Vec<_> = match owner {
        Some(provider) => vec![provider],
        None => context.providers.iter().cloned().collect(),
    };

    let elements: Vec<(String, Vec<String>)> = targets
        .iter()
        .map(|provider| {
            let regions = if regions.is_empty() {
                provider.default_regions()
            } else {
                regions.to_vec()
            };
            (provider.name().to_string(), regions)
        })
        .collect();
    Ok(PolicySuite::for_policy(
        source,
        elements.iter().map(|(name, regions)| (name.as_str(), regions.clone())),
    ))
}

fn print_text(report: &RunReport) {
    println!("Suite:   {}", report.suite);
    println!("Run:     {}", report.run_id);
    println!("Status:  {:?}", report.status);
    if report.cancelled {
        println!("Cancelled before completion.");
    }

    if !report.errors.is_empty() {
        println!();
        println!("Errors ({}):", report.errors.len());
        for error in &report.errors {
            println!("  - {}", error);
        }
    }

    if report.failed_resources.is_empty() {
        println!();
        println!("No failed resources.");
        return;
    }

    println!();
    println!(
        "{:<8} {:<12} {:<18} {:<28} {:<8} POLICY",
        "PROVIDER", "REGION", "KIND", "ID", "RESULT"
    );
    println!("{}", "-".repeat(100));
    for failed in &report.failed_resources {
        let result = match &failed.execution {
            ResourcePolicyExecution::Error { .. } => "error",
            _ => "failed",
        };
        println!(
            "{:<8} {:<12} {:<18} {:<28} {:<8} {}",
            failed.provider, failed.region, failed.kind, failed.id, result, failed.policy
        );
        if let ResourcePolicyExecution::Error { fault } = &failed.execution {
            println!("{:>9}{}", "", fault);
        } else if let Some(statement) = &failed.failed_statement {
            println!("{:>9}{}", "", statement);
        }
    }
}
