//! End-to-end CLI tests for the inquestlabs binary.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Binary isolated from the developer's key file and environment.
fn isolated_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("inquestlabs").unwrap();
    cmd.env_remove("IQLABS_APIKEY")
        .env_remove("RUST_LOG")
        .env("HOME", home.path())
        .env("USERPROFILE", home.path());
    cmd
}

/// Runs `args` against `server` on a blocking thread so the mock keeps serving.
async fn run_against(server: &MockServer, args: &[&str]) -> assert_cmd::assert::Assert {
    let base_url = format!("{}/api", server.uri());
    let args: Vec<String> = args.iter().map(|arg| (*arg).to_string()).collect();
    tokio::task::spawn_blocking(move || {
        let home = TempDir::new().unwrap();
        isolated_cmd(&home)
            .arg("--base-url")
            .arg(base_url)
            .args(args)
            .assert()
    })
    .await
    .unwrap()
}

#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("inquestlabs").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("InQuest Labs"))
        .stdout(predicate::str::contains("dfi"))
        .stdout(predicate::str::contains("yara"));
}

#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("inquestlabs").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("inquestlabs"));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let mut cmd = Command::cargo_bin("inquestlabs").unwrap();
    cmd.args(["--invalid-flag", "stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_without_command_fails() {
    let mut cmd = Command::cargo_bin("inquestlabs").unwrap();
    cmd.assert().failure();
}

#[test]
fn test_binary_debug_prints_arguments_without_network() {
    let home = TempDir::new().unwrap();
    isolated_cmd(&home)
        .args(["--debug", "--base-url", "http://127.0.0.1:9/api", "dfi", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dfi"))
        .stdout(predicate::str::contains("List"));
}

#[test]
fn test_binary_bogus_search_subcategory_fails_fast() {
    let home = TempDir::new().unwrap();
    isolated_cmd(&home)
        .args(["--base-url", "http://127.0.0.1:9/api", "dfi", "search", "bogus", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("valid subcategories include"))
        .stderr(predicate::str::contains("xmpid"));
}

#[test]
fn test_binary_upload_rejects_non_office_file() {
    let home = TempDir::new().unwrap();
    let sample = home.path().join("tool.exe");
    std::fs::write(&sample, b"MZ\x90\x00").unwrap();

    isolated_cmd(&home)
        .args(["--base-url", "http://127.0.0.1:9/api", "dfi", "upload"])
        .arg(&sample)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported file type"));
}

#[test]
fn test_binary_unreachable_api_reports_exhausted_retries() {
    let home = TempDir::new().unwrap();
    isolated_cmd(&home)
        .args(["--base-url", "http://127.0.0.1:9/api", "-r", "1", "stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeded 1 attempts"));
}

#[test]
fn test_binary_broken_key_file_is_config_error() {
    let home = TempDir::new().unwrap();
    let key_file = home.path().join("key.ini");
    std::fs::write(&key_file, "garbage without sections").unwrap();

    isolated_cmd(&home)
        .args(["--base-url", "http://127.0.0.1:9/api", "--config"])
        .arg(&key_file)
        .arg("stats")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration file"));
}

// ==================== Mock Server Tests ====================

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_stats_prints_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {"dfi": 7}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    run_against(&server, &["stats"])
        .await
        .success()
        .stdout(predicate::str::contains(r#"{"dfi":7}"#));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_api_flag_sets_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/iocdb/list"))
        .and(header("Authorization", "Basic: cli-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": []})),
        )
        .expect(1)
        .mount(&server)
        .await;

    run_against(&server, &["--api", "cli-key", "iocdb", "list"])
        .await
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_search_infers_category() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dfi/search/ioc/domain"))
        .and(query_param("keyword", "evil.example"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "data": [{"sha256": "ab"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    run_against(&server, &["dfi", "search", "domain", "evil.example"])
        .await
        .success()
        .stdout(predicate::str::contains(r#"[{"sha256":"ab"}]"#));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_yara_prints_raw_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/yara/trigger"))
        .and(query_param("is_hex", "True"))
        .and(query_param("offset", "0x3c"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "data": "uint16(0x3c) == 0x4550"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    run_against(&server, &["yara", "uint", "5045", "--offset", "0x3c", "--hex"])
        .await
        .success()
        .stdout(predicate::str::diff("uint16(0x3c) == 0x4550\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_api_error_goes_to_stderr() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dfi/list"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": false, "error": "invalid API key"})),
        )
        .mount(&server)
        .await;

    run_against(&server, &["dfi", "list"])
        .await
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("invalid API key"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_download_prints_summary() {
    let server = MockServer::start().await;
    let sample = b"PK\x03\x04 sample".to_vec();
    let sha256 = inquestlabs_core::hash::digest_bytes(
        &sample,
        inquestlabs_core::HashAlgorithm::Sha256,
    )
    .to_hex();
    Mock::given(method("GET"))
        .and(path("/api/dfi/download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(sample.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let out_dir = TempDir::new().unwrap();
    let target = out_dir.path().join("sample.zip");
    let target_arg = target.to_string_lossy().into_owned();

    run_against(&server, &["dfi", "download", &sha256, &target_arg])
        .await
        .success()
        .stdout(predicate::str::contains(format!("saved {sha256} as '")))
        .stdout(predicate::str::contains("seconds."));

    assert_eq!(std::fs::read(&target).unwrap(), sample);
}
