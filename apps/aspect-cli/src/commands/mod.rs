// mod.rs — Shared command context: configuration, providers and the runtime.

pub mod describe;
pub mod init;
pub mod inspect;
pub mod run;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use aspect_provider_aws::AwsProvider;
use aspect_suite::{
    AspectConfig, BuiltInPolicyProvider, PolicySuite, PolicySuiteSerializer, ProviderRegistry,
    SuiteError, DEFAULT_CONFIG_PATH, SUITE_EXTENSION,
};

/// Everything a command needs, resolved once from flags and configuration.
pub struct Context {
    pub config: AspectConfig,
    pub providers: Arc<ProviderRegistry>,
}

impl Context {
    /// Load configuration, apply flag overrides, and register providers.
    ///
    /// An explicit `--config` must exist; the default path is optional.
    pub fn new(
        config_path: Option<&Path>,
        inventory: Option<PathBuf>,
        concurrency: Option<usize>,
    ) -> anyhow::Result<Self> {
        let mut config = match config_path {
            Some(path) => AspectConfig::load(path)?,
            None => AspectConfig::load_or_default(Path::new(DEFAULT_CONFIG_PATH)),
        };
        if let Some(dir) = inventory {
            config.providers.inventory_dir = dir;
        }
        if let Some(n) = concurrency {
            config.runner.max_concurrency = n;
        }

        let aws = AwsProvider::new(&config.providers.inventory_dir)
            .context("failed to initialize the AWS provider")?;
        let providers = Arc::new(ProviderRegistry::new().with(Arc::new(aws)));

        tracing::debug!(
            inventory = %config.providers.inventory_dir.display(),
            max_concurrency = config.runner.max_concurrency,
            providers = ?providers.names(),
            "command context ready"
        );
        Ok(Self { config, providers })
    }

    pub fn runtime(&self) -> anyhow::Result<tokio::runtime::Runtime> {
        tokio::runtime::Runtime::new().context("failed to start the async runtime")
    }
}

/// Load a suite from a `.suite` file or a built-in suite name.
pub fn load_suite(name: &str) -> anyhow::Result<PolicySuite> {
    if BuiltInPolicyProvider::is_builtin(name) {
        return Ok(BuiltInPolicyProvider::new().suite(name)?);
    }
    if !aspect_suite::suite::has_extension(name, SUITE_EXTENSION) {
        return Err(SuiteError::UnsupportedSource {
            path: name.to_string(),
        }
        .into());
    }
    Ok(PolicySuiteSerializer.load(Path::new(name))?)
}
