//! # aspect-provider-aws
//!
//! The AWS [`CloudProvider`](aspect_suite::CloudProvider) for Aspect.
//!
//! Declares the AWS resource kinds policies can target ([`AwsRouteTable`],
//! [`AwsSecurityGroup`], [`AwsS3Bucket`]) together with their property
//! catalogs, validates region names, and discovers resources from inventory
//! snapshots laid out as `<inventory_dir>/<region>/<Kind>.json`.

pub mod error;
pub mod provider;
pub mod regions;
pub mod resources;

/// Name used as a suite element's `type`.
pub const PROVIDER_NAME: &str = "AWS";

pub use error::AwsProviderError;
pub use provider::AwsProvider;
pub use regions::{ALL_REGIONS, DEFAULT_REGION};
pub use resources::{catalog, AwsResource, AwsRouteTable, AwsS3Bucket, AwsSecurityGroup};
