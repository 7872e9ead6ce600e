// provider.rs — The AWS CloudProvider.
//
// Discovery reads inventory snapshots exported from an account:
//
//   <inventory_dir>/<region>/<Kind>.json   (a JSON array of the kind's struct)
//
// A region or kind with no snapshot file has no resources. A snapshot that
// fails to parse is a discovery error for that region and kind only.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use aspect_policy::{Resource, ResourceCatalog};
use aspect_suite::{CloudProvider, DiscoveryError, ProgressFn};
use async_trait::async_trait;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::error::{AwsProviderError, Result};
use crate::regions::{ALL_REGIONS, DEFAULT_REGION, REGION_PATTERN};
use crate::resources::{self, AwsResource, AwsRouteTable, AwsS3Bucket, AwsSecurityGroup};
use crate::PROVIDER_NAME;

#[derive(Debug)]
pub struct AwsProvider {
    inventory_dir: PathBuf,
    catalog: ResourceCatalog,
    region_pattern: Regex,
}

impl AwsProvider {
    pub fn new(inventory_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            inventory_dir: inventory_dir.into(),
            catalog: resources::catalog(),
            region_pattern: Regex::new(REGION_PATTERN)?,
        })
    }

    pub fn inventory_dir(&self) -> &Path {
        &self.inventory_dir
    }

    /// Where the snapshot for `kind` in `region` is expected.
    pub fn snapshot_path(&self, region: &str, kind: &str) -> PathBuf {
        self.inventory_dir.join(region).join(format!("{}.json", kind))
    }

    async fn load<R: AwsResource>(
        &self,
        region: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<Box<dyn Resource>>, DiscoveryError> {
        let path = self.snapshot_path(region, R::KIND);
        let bytes = tokio::select! {
            _ = cancel.cancelled() => return Err(DiscoveryError::Cancelled),
            read = tokio::fs::read(&path) => read,
        };
        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no inventory snapshot");
                return Ok(Vec::new());
            }
            Err(source) => return Err(provider_error(AwsProviderError::Io { path, source })),
        };

        let items: Vec<R> = serde_json::from_slice(&bytes)
            .map_err(|source| provider_error(AwsProviderError::Snapshot { path, source }))?;
        Ok(items
            .into_iter()
            .map(|mut item| {
                item.set_region(region);
                Box::new(item) as Box<dyn Resource>
            })
            .collect())
    }
}

fn provider_error(error: AwsProviderError) -> DiscoveryError {
    DiscoveryError::Provider {
        provider: PROVIDER_NAME.to_string(),
        source: Box::new(error),
    }
}

#[async_trait]
impl CloudProvider for AwsProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    fn all_regions(&self) -> Vec<String> {
        ALL_REGIONS.iter().map(|r| r.to_string()).collect()
    }

    fn default_regions(&self) -> Vec<String> {
        vec![DEFAULT_REGION.to_string()]
    }

    fn is_valid_region(&self, region: &str) -> bool {
        self.region_pattern.is_match(region)
    }

    async fn discover(
        &self,
        region: &str,
        kind: &str,
        progress: &ProgressFn,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<Box<dyn Resource>>, DiscoveryError> {
        if !self.is_valid_region(region) {
            return Err(DiscoveryError::InvalidRegion {
                provider: PROVIDER_NAME.to_string(),
                region: region.to_string(),
            });
        }
        let Some(descriptor) = self.catalog.get(kind) else {
            return Err(DiscoveryError::UnsupportedResource {
                provider: PROVIDER_NAME.to_string(),
                kind: kind.to_string(),
            });
        };

        progress(&format!("Loading {} in {}...", descriptor.kind, region));
        let resources = match descriptor.kind.as_str() {
            AwsRouteTable::KIND => self.load::<AwsRouteTable>(region, cancel).await?,
            AwsSecurityGroup::KIND => self.load::<AwsSecurityGroup>(region, cancel).await?,
            AwsS3Bucket::KIND => self.load::<AwsS3Bucket>(region, cancel).await?,
            other => {
                return Err(DiscoveryError::UnsupportedResource {
                    provider: PROVIDER_NAME.to_string(),
                    kind: other.to_string(),
                })
            }
        };

        tracing::debug!(
            region,
            kind = %descriptor.kind,
            count = resources.len(),
            "loaded inventory snapshot"
        );
        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> AwsProvider {
        AwsProvider::new("/nonexistent").unwrap()
    }

    #[test]
    fn region_syntax() {
        let aws = provider();
        for region in ["us-east-1", "eu-central-2", "us-gov-west-1", "ap-southeast-4"] {
            assert!(aws.is_valid_region(region), "{}", region);
        }
        for region in ["", "us-east", "US-EAST-1", "useast1", "us-east-1a", "mars"] {
            assert!(!aws.is_valid_region(region), "{}", region);
        }
    }

    #[test]
    fn every_listed_region_is_valid() {
        let aws = provider();
        for region in aws.all_regions() {
            assert!(aws.is_valid_region(&region), "{}", region);
        }
        assert_eq!(aws.default_regions(), vec!["us-east-1"]);
    }

    #[test]
    fn snapshot_layout() {
        let aws = AwsProvider::new("inv").unwrap();
        assert_eq!(
            aws.snapshot_path("eu-west-1", "AwsS3Bucket"),
            Path::new("inv").join("eu-west-1").join("AwsS3Bucket.json")
        );
    }
}
