#![allow(deprecated)] // TODO: migrate Command::cargo_bin to cargo_bin_cmd!

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn landform() -> Command {
    let mut cmd = Command::cargo_bin("landform").unwrap();
    cmd.env_remove("LANDFORM_API_TOKEN")
        .env_remove("LANDFORM_API_URL")
        .env_remove("RUST_LOG");
    cmd
}

fn write_params(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Help lists every resource
#[test]
fn test_cli_help() {
    landform()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cluster"))
        .stdout(predicate::str::contains("deployment"))
        .stdout(predicate::str::contains("job"))
        .stdout(predicate::str::contains("stage"))
        .stdout(predicate::str::contains("organization"));
}

#[test]
fn test_cli_version() {
    landform()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("landform"));
}

#[test]
fn test_cluster_update_help() {
    landform()
        .args(["cluster", "update", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--params"))
        .stdout(predicate::str::contains("--prior"))
        .stdout(predicate::str::contains("--id"));
}

#[test]
fn test_invalid_command() {
    landform().arg("invalid-command").assert().failure();
}

/// Without a token nothing is sent
#[test]
fn test_missing_token_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let params = write_params(&dir, "org.json", r#"{"name": "acme", "plan": "TEAM"}"#);

    landform()
        .args(["organization", "update", "--id", "org-1", "--params"])
        .arg(&params)
        .assert()
        .failure()
        .stderr(predicate::str::contains("LANDFORM_API_TOKEN"));
}

/// DELETED cannot be requested at creation; rejected before any request
#[test]
fn test_deployment_create_rejects_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let params = write_params(
        &dir,
        "deployment.json",
        r#"{"environment_id": "0b6a6f5c-51a4-4f4b-9a63-3a4c5b2f9d10", "desired_state": "DELETED"}"#,
    );

    landform()
        .args(["--token", "tok", "--api-url", "http://127.0.0.1:9"])
        .args(["deployment", "create", "--params"])
        .arg(&params)
        .assert()
        .failure()
        .stderr(predicate::str::contains("forbidden at creation"));
}

#[test]
fn test_organization_delete_is_not_allowed() {
    landform()
        .args(["--token", "tok", "--api-url", "http://127.0.0.1:9"])
        .args(["organization", "delete", "--id", "org-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("delete is not allowed for organization"));
}

#[test]
fn test_unreadable_params_file() {
    let dir = tempfile::tempdir().unwrap();
    let params = write_params(&dir, "job.json", "{");

    landform()
        .args(["--token", "tok"])
        .args(["job", "create", "--environment", "env-1", "--params"])
        .arg(&params)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid JSON"));
}

#[test]
fn test_api_url_must_be_http() {
    landform()
        .env("LANDFORM_API_TOKEN", "tok")
        .args(["--api-url", "ftp://example.test"])
        .args(["stage", "get", "--id", "stage-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("http:// or https://"));
}
