// inspect.rs — `aspect inspect`: evaluate ad-hoc statements over live inventory.
//
// 1. Find the provider that owns the resource kind
// 2. Compile the `&&`-joined statements into a one-off policy
// 3. Discover the kind in each requested region
// 4. Print every resource that passes, with its properties

use std::process::ExitCode;

use aspect_policy::{CompilationUnit, PolicyCompiler, Resource};
use tokio_util::sync::CancellationToken;

use super::describe::print_properties;
use super::Context;

pub fn execute(
    context: &Context,
    kind: &str,
    regions: &[String],
    statements: &str,
) -> anyhow::Result<ExitCode> {
    let Some(provider) = context.providers.provider_for_kind(kind) else {
        let catalog = context.providers.catalog();
        anyhow::bail!(
            "unknown resource type '{}'; known types: {}",
            kind,
            catalog.kinds().collect::<Vec<_>>().join(", ")
        );
    };
    let Some(descriptor) = provider.catalog().get(kind) else {
        anyhow::bail!("provider {} does not declare '{}'", provider.name(), kind);
    };

    let regions = if regions.is_empty() {
        provider.default_regions()
    } else {
        regions.to_vec()
    };
    if let Some(bad) = regions.iter().find(|r| !provider.is_valid_region(r)) {
        anyhow::bail!("'{}' is not a valid {} region", bad, provider.name());
    }

    let unit = CompilationUnit::from_statements(&descriptor.kind, statements);
    let compilation = PolicyCompiler::new().compile(unit, descriptor);
    for line in compilation.render_diagnostics() {
        eprintln!("{}", line);
    }
    let Some(policy) = compilation.into_policy() else {
        eprintln!();
        print_properties(descriptor);
        return Ok(ExitCode::from(1));
    };

    let cancel = CancellationToken::new();
    let progress = |message: &str| tracing::info!("{}", message);
    let mut resources: Vec<Box<dyn Resource>> = Vec::new();
    let runtime = context.runtime()?;
    for region in &regions {
        let found = runtime.block_on(provider.discover(region, &descriptor.kind, &progress, &cancel))?;
        resources.extend(found);
    }

    let passed: Vec<&dyn Resource> = resources
        .iter()
        .map(|r| r.as_ref())
        .filter(|r| policy.evaluate(*r).is_passed())
        .collect();

    if passed.is_empty() {
        println!(
            "No resources matched your specified input ({} {} resource(s) loaded).",
            resources.len(),
            descriptor.kind
        );
        return Ok(ExitCode::SUCCESS);
    }

    let properties = descriptor.sorted_properties();
    for resource in &passed {
        println!("{} {}", resource.kind(), resource.id());
        for property in &properties {
            println!(
                "  {:<20} {}",
                property.name,
                descriptor.format_value(*resource, &property.name)
            );
        }
    }
    println!();
    println!("{} of {} resource(s) matched.", passed.len(), resources.len());
    Ok(ExitCode::SUCCESS)
}
