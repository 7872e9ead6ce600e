// init.rs — `aspect init`: write a policy or policy suite template.
//
// The target file is created with `create_new`, so an existing file is
// never overwritten.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context as _;
use aspect_suite::{PolicySuite, PolicySuiteSerializer};

use super::Context;

pub fn execute(
    context: &Context,
    file: &Path,
    suite: bool,
    resource: Option<&str>,
) -> anyhow::Result<ExitCode> {
    if file.exists() {
        anyhow::bail!("the file {} already exists", file.display());
    }

    let contents = if suite {
        PolicySuiteSerializer.serialize(&PolicySuite::template())?
    } else {
        policy_template(&resource_kind(context, resource)?)
    };

    let mut out = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(file)
        .with_context(|| format!("failed to create {}", file.display()))?;
    out.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write {}", file.display()))?;

    println!("Created {}", file.display());
    Ok(ExitCode::SUCCESS)
}

/// The canonical name of the requested kind, or the first known kind.
fn resource_kind(context: &Context, requested: Option<&str>) -> anyhow::Result<String> {
    let catalog = context.providers.catalog();
    match requested {
        Some(kind) => catalog
            .get(kind)
            .map(|d| d.kind.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "unknown resource type '{}'; known types: {}",
                    kind,
                    catalog.kinds().collect::<Vec<_>>().join(", ")
                )
            }),
        None => catalog
            .kinds()
            .next()
            .map(str::to_string)
            .context("no resource types are registered"),
    }
}

fn policy_template(resource: &str) -> String {
    format!(
        "resource \"{}\"\n\nvalidate {{\n    # Enter one or more statements like the following that should be validated\n    input.Property == \"something\"\n}}\n",
        resource
    )
}
