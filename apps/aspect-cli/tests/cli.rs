// cli.rs — End-to-end tests for the `aspect` binary.
//
// Every test works in its own tempdir: an inventory of snapshots under
// `inventory/`, policies and suites next to it, and the binary run with that
// directory as its working directory so no stray configuration is picked up.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn aspect(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_aspect"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// A working directory with S3 buckets and security groups in us-east-1.
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let region = dir.path().join("inventory").join("us-east-1");
    fs::create_dir_all(&region).unwrap();
    fs::write(
        region.join("AwsS3Bucket.json"),
        r#"[
            {"Name": "app-logs", "Public": false, "Versioning": true, "Encryption": "AES256"},
            {"Name": "marketing-site", "Public": true, "Versioning": true, "Encryption": "AES256"}
        ]"#,
    )
    .unwrap();
    fs::write(
        region.join("AwsSecurityGroup.json"),
        r#"[{"GroupId": "sg-internal", "Ingress": []}]"#,
    )
    .unwrap();
    dir
}

// =========================================================
// run
// =========================================================

#[test]
fn run_builtin_suite_reports_failures_as_json() {
    let dir = workspace();
    let output = aspect(
        dir.path(),
        &["--inventory", "inventory", "run", "builtin/aws-baseline.suite"],
    );
    assert_eq!(output.status.code(), Some(3), "{}", stderr(&output));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["suite"], "AWS Baseline");
    assert_eq!(report["status"], "failures");
    assert_eq!(report["errors"].as_array().unwrap().len(), 0);

    let failed = report["failed_resources"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["id"], "marketing-site");
    assert_eq!(failed[0]["region"], "us-east-1");
    assert_eq!(failed[0]["failed_statement"], "input.Public == false");
}

#[test]
fn run_single_policy_file_in_text_format() {
    let dir = workspace();
    fs::write(
        dir.path().join("versioned.policy"),
        "resource \"AwsS3Bucket\"\nvalidate {\n    input.Versioning == true\n}\n",
    )
    .unwrap();

    let output = aspect(
        dir.path(),
        &["--inventory", "inventory", "run", "versioned.policy", "--format", "text"],
    );
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Suite:   Policy: versioned.policy"), "{}", text);
    assert!(text.contains("No failed resources."), "{}", text);
}

#[test]
fn run_policy_with_compile_error_exits_2() {
    let dir = workspace();
    fs::write(
        dir.path().join("broken.policy"),
        "resource \"AwsS3Bucket\"\nvalidate {\n    input.Nope == true\n}\n",
    )
    .unwrap();

    let output = aspect(dir.path(), &["--inventory", "inventory", "run", "broken.policy"]);
    assert_eq!(output.status.code(), Some(2), "{}", stderr(&output));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let errors = report["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().contains("ASP0022"));
}

#[test]
fn run_invalid_suite_exits_1_without_running() {
    let dir = workspace();
    fs::write(
        dir.path().join("bad.suite"),
        "name: Bad\npolicies:\n  - name: Nowhere\n    type: Azure\n    regions: [uksouth]\n    policies: [missing.policy]\n",
    )
    .unwrap();

    let output = aspect(dir.path(), &["--inventory", "inventory", "run", "bad.suite"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    let err = stderr(&output);
    assert!(err.contains("unknown provider type"), "{}", err);
    assert!(err.contains("missing.policy"), "{}", err);
}

#[test]
fn run_rejects_unsupported_sources() {
    let dir = workspace();
    let output = aspect(dir.path(), &["run", "notes.txt"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("not a policy source"));
}

#[test]
fn usage_errors_exit_1() {
    let dir = workspace();
    assert_eq!(aspect(dir.path(), &["frobnicate"]).status.code(), Some(1));
    assert_eq!(aspect(dir.path(), &["--help"]).status.code(), Some(0));
}

// =========================================================
// init / validate
// =========================================================

#[test]
fn init_writes_policy_template_and_never_overwrites() {
    let dir = workspace();
    let output = aspect(dir.path(), &["init", "new.policy", "--resource", "awss3bucket"]);
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));

    let written = fs::read_to_string(dir.path().join("new.policy")).unwrap();
    assert!(written.starts_with("resource \"AwsS3Bucket\""));
    assert!(written.contains("input.Property == \"something\""));

    let again = aspect(dir.path(), &["init", "new.policy", "--resource", "AwsS3Bucket"]);
    assert_eq!(again.status.code(), Some(1));
    assert!(stderr(&again).contains("already exists"));
    assert_eq!(fs::read_to_string(dir.path().join("new.policy")).unwrap(), written);
}

#[test]
fn init_suite_template_validates_once_its_policy_exists() {
    let dir = workspace();
    let output = aspect(dir.path(), &["init", "mine.suite", "--suite"]);
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));

    let invalid = aspect(dir.path(), &["validate", "mine.suite"]);
    assert_eq!(invalid.status.code(), Some(1));
    assert!(stdout(&invalid).contains("MyPolicy.policy"));

    fs::create_dir_all(dir.path().join("policies")).unwrap();
    fs::write(
        dir.path().join("policies").join("MyPolicy.policy"),
        "resource \"AwsS3Bucket\"\nvalidate {\n    input.Public == false\n}\n",
    )
    .unwrap();
    let valid = aspect(dir.path(), &["validate", "mine.suite"]);
    assert_eq!(valid.status.code(), Some(0), "{}", stdout(&valid));
}

// =========================================================
// describe / inspect
// =========================================================

#[test]
fn describe_lists_kinds_and_properties() {
    let dir = workspace();
    let kinds = stdout(&aspect(dir.path(), &["describe"]));
    assert!(kinds.contains("AWS (default regions: us-east-1)"));
    assert!(kinds.contains("AwsSecurityGroup"));

    let properties = stdout(&aspect(dir.path(), &["describe", "AwsS3Bucket"]));
    let encryption = properties.find("- Encryption").unwrap();
    let versioning = properties.find("- Versioning").unwrap();
    assert!(encryption < versioning);

    assert_eq!(aspect(dir.path(), &["describe", "AwsLambda"]).status.code(), Some(1));
}

#[test]
fn inspect_lists_matching_resources() {
    let dir = workspace();
    let output = aspect(
        dir.path(),
        &[
            "--inventory",
            "inventory",
            "inspect",
            "--resource",
            "AwsS3Bucket",
            "input.Public == true && input.Versioning == true",
        ],
    );
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("AwsS3Bucket marketing-site"), "{}", text);
    assert!(!text.contains("app-logs"), "{}", text);
    assert!(text.contains("1 of 2 resource(s) matched."), "{}", text);
}

#[test]
fn inspect_reports_compile_errors() {
    let dir = workspace();
    let output = aspect(
        dir.path(),
        &["inspect", "--resource", "AwsS3Bucket", "input.public == true"],
    );
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("ASP0022"), "{}", err);
    assert!(err.contains("did you mean 'Public'?"), "{}", err);
}
