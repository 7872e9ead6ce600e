//! # aspect
//!
//! Command-line interface for Aspect cloud resource policies.
//!
//! - `aspect run <source>` runs a `.suite`, a `.policy` or a `builtin/...` name
//! - `aspect validate <suite>` checks a suite's structure without running it
//! - `aspect init <file>` writes a policy or suite template
//! - `aspect inspect --resource <Kind> "<statements>"` lists matching resources
//! - `aspect describe [<Kind>]` shows providers, resource kinds and properties
//!
//! Exit codes: 0 clean, 1 invalid suite or usage error, 2 compile, discovery
//! or source errors, 3 failed resources only.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use aspect_suite::OutputFormat;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::Context;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("ASPECT_GIT_HASH"),
    " ",
    env!("ASPECT_BUILD_DATE"),
    ")"
);

/// Aspect: compile and run policies against cloud resources.
#[derive(Parser)]
#[command(name = "aspect", version, long_version = LONG_VERSION, about)]
struct Cli {
    /// Configuration file (defaults to .aspect/config.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Inventory snapshot directory (overrides the configuration).
    #[arg(long, global = true)]
    inventory: Option<PathBuf>,

    /// Number of element/region units run concurrently (overrides the configuration).
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and run a policy suite, a policy file or a built-in.
    Run {
        /// `.suite` file, `.policy` file, or `builtin/...` name.
        source: String,
        /// Report format: json or text.
        #[arg(long)]
        format: Option<OutputFormat>,
        /// Regions to scan when running a single policy (repeatable).
        #[arg(long = "region")]
        regions: Vec<String>,
    },
    /// Check a policy suite's structure without running it.
    Validate {
        /// `.suite` file or `builtin/...` suite name.
        suite: String,
    },
    /// Write a policy or policy suite template.
    Init {
        /// File to create. Existing files are never overwritten.
        file: PathBuf,
        /// Write a policy suite instead of a policy.
        #[arg(long)]
        suite: bool,
        /// Resource kind the policy validates.
        #[arg(long, conflicts_with = "suite")]
        resource: Option<String>,
    },
    /// Evaluate ad-hoc statements and list the resources that pass them.
    Inspect {
        /// Resource kind to load.
        #[arg(long)]
        resource: String,
        /// Regions to load (repeatable; defaults to the provider's default regions).
        #[arg(long = "region")]
        regions: Vec<String>,
        /// Statements joined by `&&`, e.g. `input.Public == true && input.Versioning == false`.
        statements: String,
    },
    /// List providers and resource kinds, or the properties of one kind.
    Describe {
        /// Resource kind to describe.
        kind: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("error: {:#}", e);
        return ExitCode::from(1);
    }

    match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    let context = Context::new(cli.config.as_deref(), cli.inventory, cli.concurrency)?;

    match cli.command {
        Commands::Run {
            source,
            format,
            regions,
        } => commands::run::execute(&context, &source, format, &regions),
        Commands::Validate { suite } => commands::validate::execute(&context, &suite),
        Commands::Init {
            file,
            suite,
            resource,
        } => commands::init::execute(&context, &file, suite, resource.as_deref()),
        Commands::Inspect {
            resource,
            regions,
            statements,
        } => commands::inspect::execute(&context, &resource, &regions, &statements),
        Commands::Describe { kind } => commands::describe::execute(&context, kind.as_deref()),
    }
}

/// Logs go to stderr so reports on stdout stay machine-readable.
/// `RUST_LOG`, when set, replaces the default directives.
fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let filter = if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        EnvFilter::from_default_env()
    } else {
        let level = if verbose { "debug" } else { "info" };
        let mut filter = EnvFilter::new("warn");
        for target in ["aspect_cli", "aspect_suite", "aspect_policy", "aspect_provider_aws"] {
            filter = filter.add_directive(format!("{}={}", target, level).parse()?);
        }
        filter
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
    Ok(())
}
