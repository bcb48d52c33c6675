// reverse-whois/tests/cli_integration.rs

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use tempfile::{NamedTempFile, TempDir};
use tokio_test::assert_ok;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Command with every RW_* variable cleared so the host environment can't leak in.
fn cli() -> Command {
    let mut cmd = Command::cargo_bin("reverse-whois").unwrap();
    for var in [
        "RW_API_KEY",
        "RW_THREADS",
        "RW_RATE_LIMIT",
        "RW_PROXY",
        "RW_ENDPOINT",
        "RW_TIMEOUT",
        "RW_CONFIG",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Helper to create a config file with the given keys
fn create_config_file(keys: &[&str]) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    let quoted: Vec<String> = keys.iter().map(|k| format!("\"{}\"", k)).collect();
    fs::write(file.path(), format!("api_keys = [{}]\n", quoted.join(", ")))
        .expect("Failed to write to temp file");
    file
}

fn endpoint(server: &MockServer) -> String {
    format!("{}/api/v2", server.uri())
}

#[test]
fn test_help_lists_flags() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--target-list"))
        .stdout(predicate::str::contains("--rate-limit"))
        .stdout(predicate::str::contains("--preview"))
        .stdout(predicate::str::contains("--exclude"));
}

#[test]
fn test_version_flag() {
    cli()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_rate_limit_above_maximum_exits_2() {
    cli()
        .args(["-t", "acme", "--rate-limit", "31"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("exceeds API maximum (30 rps)"));
}

#[test]
fn test_zero_threads_exits_2() {
    cli()
        .args(["-t", "acme", "--threads", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--threads must be >= 1."));
}

#[test]
fn test_too_many_excludes_exits_2() {
    cli()
        .args(["-t", "acme", "-e", "a,b,c", "-e", "d", "-e", "e"])
        .assert()
        .code(2);
}

#[test]
fn test_no_targets_exits_2() {
    let config = create_config_file(&["k1"]);
    cli()
        .args(["--config", config.path().to_str().unwrap(), "-s"])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No targets provided"));
}

#[test]
fn test_fatal_errors_print_no_banner() {
    let config = create_config_file(&["k1"]);
    cli()
        .args(["--config", config.path().to_str().unwrap()])
        .write_stdin("")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No targets provided"));

    let empty = create_config_file(&[]);
    cli()
        .args(["--config", empty.path().to_str().unwrap(), "-t", "acme"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("haltman.io").not())
        .stderr(predicate::str::contains("No API key configured"));
}

#[test]
fn test_missing_api_key_exits_2() {
    let config = create_config_file(&[]);
    cli()
        .args(["--config", config.path().to_str().unwrap(), "-t", "acme", "-s"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No API key configured"));
}

#[test]
fn test_missing_explicit_config_exits_2() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");
    cli()
        .args(["--config", missing.to_str().unwrap(), "-t", "acme", "--api-key", "k"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_unreadable_target_list_exits_2() {
    let config = create_config_file(&["k1"]);
    cli()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "-l",
            "/definitely/not/here.txt",
            "-s",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed reading target list"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_purchase_end_to_end_writes_deduplicated_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2"))
        .and(body_partial_json(json!({ "basicSearchTerms": { "include": ["acme"] } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "domainsCount": 2,
            "domainsList": ["a.com", "shared.com"]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v2"))
        .and(body_partial_json(json!({ "basicSearchTerms": { "include": ["globex"] } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "domainsCount": 1,
            "domainsList": ["shared.com"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_config_file(&[]);
    let out_dir = TempDir::new().unwrap();
    let out_path = out_dir.path().join("results.txt");
    fs::write(&out_path, "stale\n").unwrap();

    cli()
        .env("RW_ENDPOINT", endpoint(&server))
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "--api-key",
            "k1",
            "--no-proxy",
            "--no-color",
            "--threads",
            "1",
            "-t",
            "acme,globex,acme",
            "-o",
            out_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("haltman.io"))
        .stdout(predicate::str::contains(
            "[acme] [purchase] [current] [domain: a.com]",
        ))
        .stdout(predicate::str::contains(
            "[globex] [purchase] [current] [domain: shared.com]",
        ));

    let written = assert_ok!(fs::read_to_string(&out_path));
    assert_eq!(written, "a.com\nshared.com\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_preview_from_stdin_with_rotated_keys() {
    let server = MockServer::start().await;
    for key in ["k1", "k2"] {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "apiKey": key,
                "mode": "preview",
                "searchType": "historic"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "domainsCount": 4 })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = create_config_file(&["k1", "k2"]);

    cli()
        .env("RW_ENDPOINT", endpoint(&server))
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "--no-proxy",
            "--preview",
            "--history",
            "-s",
        ])
        .write_stdin("acme\nglobex\nacme\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[acme] [preview] [historic] [domainsCount: 4]",
        ))
        .stdout(predicate::str::contains("haltman.io").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_failure_exits_1_and_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let config = create_config_file(&["k1"]);

    cli()
        .env("RW_ENDPOINT", endpoint(&server))
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "--no-proxy",
            "--no-color",
            "-t",
            "acme",
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "[acme] [purchase] [current] [http_error: 403 Forbidden",
        ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_silent_hides_failure_lines_but_keeps_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let config = create_config_file(&["k1"]);

    cli()
        .env("RW_ENDPOINT", endpoint(&server))
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "--no-proxy",
            "-q",
            "-t",
            "acme",
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}
