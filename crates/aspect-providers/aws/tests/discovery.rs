// discovery.rs — AWS snapshot discovery and built-in policies end to end.
//
// Each test lays out an inventory directory in a tempdir, then discovers
// from it directly or runs built-in suites over it with the suite runner.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use aspect_policy::Resource;
use aspect_provider_aws::AwsProvider;
use aspect_suite::{
    BuiltInPolicyProvider, CloudProvider, DiscoveryError, PolicySuiteRunner,
    PolicySuiteValidator, ProviderRegistry, RunError, RunReport, RunStatus,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn write_snapshot(inventory: &Path, region: &str, kind: &str, json: &str) {
    let dir = inventory.join(region);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{}.json", kind)), json).unwrap();
}

const BUCKETS: &str = r#"[
    {"Name": "app-logs", "Public": false, "Versioning": true, "Encryption": "AES256"},
    {"Name": "marketing-site", "Public": true, "Versioning": true, "Encryption": "AES256"},
    {"Name": "raw-uploads", "Public": false, "Versioning": false}
]"#;

const GROUPS: &str = r#"[
    {"GroupId": "sg-web", "Ingress": [{"Protocol": "tcp", "FromPort": 443, "ToPort": 443, "CidrBlocks": ["0.0.0.0/0"]}]},
    {"GroupId": "sg-internal", "Ingress": [{"Protocol": "tcp", "FromPort": 5432, "ToPort": 5432, "CidrBlocks": ["10.0.0.0/8"]}]}
]"#;

const ROUTE_TABLES: &str = r#"[
    {"RouteTableId": "rtb-main", "Routes": [{"DestinationCidrBlock": "10.0.0.0/16", "GatewayId": "local"}], "Tags": {"Name": "main"}},
    {"RouteTableId": "rtb-untagged", "Routes": []}
]"#;

fn noop(_: &str) {}

// =========================================================
// Direct discovery
// =========================================================

#[tokio::test]
async fn discovers_snapshot_and_stamps_region() {
    let inventory = TempDir::new().unwrap();
    write_snapshot(inventory.path(), "eu-west-1", "AwsS3Bucket", BUCKETS);
    let aws = AwsProvider::new(inventory.path()).unwrap();

    let resources = aws
        .discover("eu-west-1", "awss3bucket", &noop, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(resources.len(), 3);
    assert_eq!(resources[1].id(), "marketing-site");
    assert_eq!(resources[1].property("Region"), Some("eu-west-1".into()));
}

#[tokio::test]
async fn missing_snapshot_means_no_resources() {
    let inventory = TempDir::new().unwrap();
    let aws = AwsProvider::new(inventory.path()).unwrap();
    let resources = aws
        .discover("us-east-1", "AwsRouteTable", &noop, &CancellationToken::new())
        .await
        .unwrap();
    assert!(resources.is_empty());
}

#[tokio::test]
async fn malformed_snapshot_is_a_discovery_error() {
    let inventory = TempDir::new().unwrap();
    write_snapshot(inventory.path(), "us-east-1", "AwsSecurityGroup", "{not json");
    let aws = AwsProvider::new(inventory.path()).unwrap();

    let err = aws
        .discover("us-east-1", "AwsSecurityGroup", &noop, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::Provider { .. }));
    assert!(err.to_string().contains("AwsSecurityGroup.json"));
}

#[tokio::test]
async fn rejects_bad_region_unknown_kind_and_cancellation() {
    let inventory = TempDir::new().unwrap();
    let aws = AwsProvider::new(inventory.path()).unwrap();

    let bad_region = aws
        .discover("moon-1", "AwsS3Bucket", &noop, &CancellationToken::new())
        .await;
    assert!(matches!(bad_region, Err(DiscoveryError::InvalidRegion { .. })));

    let unknown = aws
        .discover("us-east-1", "AwsLambda", &noop, &CancellationToken::new())
        .await;
    assert!(matches!(unknown, Err(DiscoveryError::UnsupportedResource { .. })));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let cancelled = aws.discover("us-east-1", "AwsS3Bucket", &noop, &cancel).await;
    assert!(matches!(cancelled, Err(DiscoveryError::Cancelled)));
}

// =========================================================
// Built-in suite over a snapshot
// =========================================================

#[tokio::test]
async fn baseline_suite_flags_violations() {
    let inventory = TempDir::new().unwrap();
    write_snapshot(inventory.path(), "us-east-1", "AwsS3Bucket", BUCKETS);
    write_snapshot(inventory.path(), "us-east-1", "AwsSecurityGroup", GROUPS);
    write_snapshot(inventory.path(), "us-east-1", "AwsRouteTable", ROUTE_TABLES);

    let aws = AwsProvider::new(inventory.path()).unwrap();
    let registry = Arc::new(ProviderRegistry::new().with(Arc::new(aws)));
    let suite = BuiltInPolicyProvider::new()
        .suite("builtin\\aws-baseline.suite")
        .unwrap();

    let validation = PolicySuiteValidator::new(&registry).validate(&suite);
    assert!(validation.is_valid, "{:?}", validation.errors);

    let results = PolicySuiteRunner::new(Arc::clone(&registry))
        .run(&suite, CancellationToken::new())
        .await;
    let report = RunReport::new(&suite.name, chrono::Utc::now(), &results, false);

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(report.status, RunStatus::Failures);

    let mut failed: Vec<(String, String)> = report
        .failed_resources
        .iter()
        .map(|f| (f.policy.clone(), f.id.clone()))
        .collect();
    failed.sort();
    assert_eq!(
        failed,
        vec![
            (
                "builtin/aws/route-table-tagged.policy".to_string(),
                "rtb-untagged".to_string()
            ),
            (
                "builtin/aws/s3-no-public-buckets.policy".to_string(),
                "marketing-site".to_string()
            ),
            (
                "builtin/aws/s3-no-public-buckets.policy".to_string(),
                "raw-uploads".to_string()
            ),
            (
                "builtin/aws/s3-versioning-enabled.policy".to_string(),
                "raw-uploads".to_string()
            ),
            (
                "builtin/aws/sg-no-world-ingress.policy".to_string(),
                "sg-web".to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn malformed_snapshot_only_blocks_its_kind() {
    let inventory = TempDir::new().unwrap();
    write_snapshot(inventory.path(), "us-east-1", "AwsS3Bucket", "[{\"Public\": true}]");
    write_snapshot(inventory.path(), "us-east-1", "AwsSecurityGroup", GROUPS);

    let registry = Arc::new(
        ProviderRegistry::new().with(Arc::new(AwsProvider::new(inventory.path()).unwrap())),
    );
    let suite = BuiltInPolicyProvider::new()
        .suite("builtin/aws-baseline.suite")
        .unwrap();
    let results = PolicySuiteRunner::new(registry)
        .run(&suite, CancellationToken::new())
        .await;

    let discovery_errors: Vec<&str> = results
        .iter()
        .filter_map(|r| match r.error() {
            Some(RunError::Discovery { .. }) => Some(r.policy.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        discovery_errors,
        vec![
            "builtin/aws/s3-no-public-buckets.policy",
            "builtin/aws/s3-versioning-enabled.policy"
        ]
    );

    let report = RunReport::new(&suite.name, chrono::Utc::now(), &results, false);
    assert_eq!(report.status.exit_code(), 2);
    assert_eq!(report.failed_resources.len(), 1);
}
