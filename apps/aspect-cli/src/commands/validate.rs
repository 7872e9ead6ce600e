// validate.rs — `aspect validate`: structural checks without running.

use std::process::ExitCode;

use aspect_suite::PolicySuiteValidator;

use super::{load_suite, Context};

pub fn execute(context: &Context, name: &str) -> anyhow::Result<ExitCode> {
    let suite = load_suite(name)?;
    let result = PolicySuiteValidator::new(&context.providers).validate(&suite);

    if result.is_valid {
        println!(
            "{}: valid ({} element(s), {} unit(s))",
            name,
            suite.policies.len(),
            suite.unit_count()
        );
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}: invalid", name);
    for error in &result.errors {
        println!("  - {}", error);
    }
    Ok(ExitCode::from(1))
}
