// describe.rs — `aspect describe`: providers, resource kinds and properties.

use std::process::ExitCode;

use aspect_policy::ResourceDescriptor;

use super::Context;

pub fn execute(context: &Context, kind: Option<&str>) -> anyhow::Result<ExitCode> {
    let Some(kind) = kind else {
        for provider in context.providers.iter() {
            println!(
                "{} (default regions: {})",
                provider.name(),
                provider.default_regions().join(", ")
            );
            for descriptor in provider.catalog().iter() {
                println!("  {:<20} {}", descriptor.kind, descriptor.description);
            }
        }
        return Ok(ExitCode::SUCCESS);
    };

    let catalog = context.providers.catalog();
    let descriptor = catalog.get(kind).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown resource type '{}'; known types: {}",
            kind,
            catalog.kinds().collect::<Vec<_>>().join(", ")
        )
    })?;
    print_properties(descriptor);
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn print_properties(descriptor: &ResourceDescriptor) {
    println!("{} ({})", descriptor.kind, descriptor.provider);
    if !descriptor.description.is_empty() {
        println!("  {}", descriptor.description);
    }
    println!();
    println!("Available properties for input '{}':", descriptor.kind);
    for property in descriptor.sorted_properties() {
        println!(
            "  - {:<20} {:<11} {}",
            property.name,
            property.property_type.to_string(),
            property.description
        );
    }
}
