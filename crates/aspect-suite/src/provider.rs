// provider.rs — The cloud provider contract and the provider registry.
//
// A provider declares the resource kinds it can discover (as a property
// catalog, available without any network call), the regions it knows, and
// an async `discover` that returns the resources of one kind in one region.
// Discovery receives the run's cancellation token and is expected to return
// promptly once it fires.

use std::fmt;
use std::sync::Arc;

use aspect_policy::{Resource, ResourceCatalog};
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Status callback for long-running discovery (e.g. "Loading AwsS3Bucket in us-east-1").
pub type ProgressFn = dyn Fn(&str) + Send + Sync;

/// A discovery fault. Non-fatal to a run: it blocks only the affected
/// element/region/kind combination.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("provider '{provider}' cannot discover resources of type '{kind}'")]
    UnsupportedResource { provider: String, kind: String },

    #[error("'{region}' is not a valid {provider} region")]
    InvalidRegion { provider: String, region: String },

    #[error("discovery cancelled")]
    Cancelled,

    #[error("{provider} discovery failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Name used as an element's `type` (e.g. `AWS`).
    fn name(&self) -> &str;

    /// Property catalogs for every resource kind this provider discovers.
    fn catalog(&self) -> &ResourceCatalog;

    fn all_regions(&self) -> Vec<String>;

    /// Regions scanned when a single policy is run without a suite.
    fn default_regions(&self) -> Vec<String>;

    fn is_valid_region(&self, region: &str) -> bool;

    async fn discover(
        &self,
        region: &str,
        kind: &str,
        progress: &ProgressFn,
        cancel: &CancellationToken,
    ) -> Result<Vec<Box<dyn Resource>>, DiscoveryError>;
}

/// The set of providers available to a run, looked up case-insensitively.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn CloudProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider, replacing any existing one with the same name.
    pub fn register(&mut self, provider: Arc<dyn CloudProvider>) {
        self.providers
            .retain(|p| !p.name().eq_ignore_ascii_case(provider.name()));
        self.providers.push(provider);
    }

    pub fn with(mut self, provider: Arc<dyn CloudProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CloudProvider>> {
        self.providers
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn CloudProvider>> {
        self.providers.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Every provider's catalog merged into one, for introspection.
    pub fn catalog(&self) -> ResourceCatalog {
        let mut merged = ResourceCatalog::new();
        for provider in &self.providers {
            merged.merge(provider.catalog());
        }
        merged
    }

    /// The provider that declares resource `kind`, if any.
    pub fn provider_for_kind(&self, kind: &str) -> Option<Arc<dyn CloudProvider>> {
        self.providers
            .iter()
            .find(|p| p.catalog().get(kind).is_some())
            .cloned()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
